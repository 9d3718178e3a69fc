// Route handlers, one module per resource. Access gates are attached in
// `routes`, so every handler here assumes its caller is already allowed in.
pub mod auth;
pub mod companies;
pub mod health;
pub mod jobs;
pub mod users;
