//! Job CRUD operations (read and write).

mod read;
mod write;
