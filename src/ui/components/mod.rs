pub mod bar;
pub mod date_input;
pub mod form;
pub mod popup;
