pub mod cleaning;
pub mod io;
pub mod text;
pub mod types;

pub use cleaning::{CleanOutcome, Cleaner, clean, standardize_name};
pub use io::{load_df, read_csv_bytes, save_df, upload_name, write_csv_bytes};
pub use text::{EnglishNormalizer, TextNormalizer, TextOptions};
pub use types::{CleaningOptions, FillMethod, NumericConversion};

#[cfg(test)]
mod tests;
