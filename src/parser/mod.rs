pub mod detail;
pub mod links;
pub mod table;

pub use detail::extract_notes;
pub use links::find_survey_links;
pub use table::parse_rows;
