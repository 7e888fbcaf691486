mod resolver;
mod types;
#[cfg(test)]
mod tests;

pub use resolver::DeviceResolver;
pub use types::{DeviceCharacteristics, DeviceDescriptor, LensFacing, Size};
