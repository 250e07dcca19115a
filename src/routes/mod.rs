pub mod answer;
pub mod authentication;
pub mod chat;
pub mod document;
pub mod feed;
pub mod profile;
pub mod question;
pub mod star;
pub mod vote;
