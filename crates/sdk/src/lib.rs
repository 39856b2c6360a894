mod github;

pub use github::*;
