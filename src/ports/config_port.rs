//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Keys of `section` in file order; empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
