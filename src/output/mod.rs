mod response;

pub use response::{print_json_result, render_error};
