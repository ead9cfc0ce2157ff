pub mod url_input;
