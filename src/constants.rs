/// Column and table names shared by the loader, transformer and persister.

/// Join key present in both input files
pub const ID_COLUMN: &str = "id";

/// Packed `name-value;name-value` column in the categories file
pub const CATEGORIES_COLUMN: &str = "categories";

/// Destination table when nothing else is configured
pub const DEFAULT_TABLE_NAME: &str = "messages_cleaned";

pub const DEFAULT_CATEGORY_SEPARATOR: char = ';';
pub const DEFAULT_DELIMITER: char = ',';

// Suffixes for non-key columns that appear in both inputs
pub const LEFT_SUFFIX: &str = "_x";
pub const RIGHT_SUFFIX: &str = "_y";

/// Number of trailing characters (`-0` / `-1`) stripped from a segment to get its name
pub const CATEGORY_VALUE_SUFFIX_LEN: usize = 2;

pub const USAGE: &str = "Please provide the filepaths of the messages and categories \
datasets as the first and second argument respectively, as \
well as the filepath of the database to save the cleaned data \
to as the third argument. \n\nExample: process_data \
disaster_messages.csv disaster_categories.csv \
DisasterResponse.db";
