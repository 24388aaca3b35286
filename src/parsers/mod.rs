pub mod openapi;
pub mod ui_requirements;
