/// Compile a regex literal once and hand out a `&'static Regex`.
///
/// Structural phases use this for their fixed patterns so that every
/// `encode` call shares the same compiled automata.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}
