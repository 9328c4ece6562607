//! Resource shaping helpers shared by collectors

pub mod shaping;

pub use shaping::{decode_json_inline, sort_list_by, str_field, tidy_response_metadata};
