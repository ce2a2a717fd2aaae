pub mod feedback;
pub mod root;
pub mod stream;
