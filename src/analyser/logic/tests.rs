mod cleaning;
