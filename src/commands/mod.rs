pub mod run;
pub mod tune;
pub mod validate;
