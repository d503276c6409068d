pub mod board;
pub mod member;
pub mod register;
pub mod serve;
