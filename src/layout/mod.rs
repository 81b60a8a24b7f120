pub mod extract;
pub mod model;
pub mod parser;
pub mod validator;
