pub mod aggregate;
pub mod latency;
pub mod normalize;
pub mod participation;
pub mod policy;
pub mod reliability;
pub mod transparency;

#[cfg(test)]
pub(crate) mod test_support;
