pub mod attached_sink;
pub mod dataset;
pub mod normalize;
pub mod table_sink;

// Name of the in-memory DuckDB table holding the loaded file
pub const DATASET_TABLE: &str = "source_data";

// Double-quote an identifier for DuckDB SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// Single-quote a string literal for DuckDB SQL
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
