pub mod serper;

pub use serper::SerperSearchProvider;
