pub mod account;
pub mod answer;
pub mod chat;
pub mod document;
pub mod feed;
pub mod pagination;
pub mod profile;
pub mod question;
pub mod star;
pub mod vote;
