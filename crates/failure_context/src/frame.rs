/// Local bindings captured for one frame, in the order the host captured them.
///
/// Names are unique: inserting a name again replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    bindings: Vec<(String, LocalValue)>,
}

impl Locals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name`, or replaces its value without moving it. Returns the replaced value.
    pub fn insert(&mut self, name: impl Into<String>, value: LocalValue) -> Option<LocalValue> {
        let name = name.into();
        match self.bindings.iter_mut().find(|(bound, _)| *bound == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.bindings.push((name, value));
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LocalValue> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LocalValue)> {
        self.bindings.iter().map(binding_ref)
    }
}

fn binding_ref(binding: &(String, LocalValue)) -> (&String, &LocalValue) {
    (&binding.0, &binding.1)
}

impl FromIterator<(String, LocalValue)> for Locals {
    fn from_iter<I: IntoIterator<Item = (String, LocalValue)>>(iter: I) -> Self {
        let mut locals = Self::new();
        for (name, value) in iter {
            locals.insert(name, value);
        }
        locals
    }
}

impl IntoIterator for Locals {
    type Item = (String, LocalValue);
    type IntoIter = std::vec::IntoIter<(String, LocalValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.into_iter()
    }
}

impl<'a> IntoIterator for &'a Locals {
    type Item = (&'a String, &'a LocalValue);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, LocalValue)>,
        fn(&'a (String, LocalValue)) -> (&'a String, &'a LocalValue),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings
            .iter()
            .map(binding_ref as fn(&'a (String, LocalValue)) -> (&'a String, &'a LocalValue))
    }
}

/// Host-supplied view of one live stack frame.
///
/// This is the only structure the builder assumes about a frame. Hosts implement it on top of
/// whatever unwind or debug-info facility they have; [`CapturedFrame`] is the owned default.
pub trait FrameReference {
    fn function_name(&self) -> &str;

    fn file_path(&self) -> &str;

    /// 1-based line that was executing when the failure was raised.
    fn line_number(&self) -> usize;

    /// Bindings the host chooses to expose. `None` when capture is unsupported or disallowed.
    fn locals(&self) -> Option<&Locals> {
        None
    }

    /// Source text the runtime kept in memory for this frame, used when the path is unreadable.
    fn embedded_source(&self) -> Option<&EmbeddedSource> {
        None
    }
}

/// Source text held in memory for code with no backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSource {
    pub text: String,
    /// Line number of the first line of `text` within the original unit.
    pub start_line: usize,
}

impl EmbeddedSource {
    #[must_use]
    pub fn new(text: impl Into<String>, start_line: usize) -> Self {
        Self {
            text: text.into(),
            start_line: start_line.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    function_name: String,
    file_path: String,
    line_number: usize,
    locals: Option<Locals>,
    embedded_source: Option<EmbeddedSource>,
}

impl CapturedFrame {
    #[must_use]
    pub fn new(
        function_name: impl Into<String>,
        file_path: impl Into<String>,
        line_number: usize,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            file_path: file_path.into(),
            line_number,
            locals: None,
            embedded_source: None,
        }
    }

    #[must_use]
    pub fn with_locals(mut self, locals: Locals) -> Self {
        self.locals = Some(locals);
        self
    }

    #[must_use]
    pub fn with_local(mut self, name: impl Into<String>, value: LocalValue) -> Self {
        self.locals
            .get_or_insert_with(Locals::new)
            .insert(name, value);
        self
    }

    #[must_use]
    pub fn with_embedded_source(mut self, source: EmbeddedSource) -> Self {
        self.embedded_source = Some(source);
        self
    }
}

impl FrameReference for CapturedFrame {
    fn function_name(&self) -> &str {
        &self.function_name
    }

    fn file_path(&self) -> &str {
        &self.file_path
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn locals(&self) -> Option<&Locals> {
        self.locals.as_ref()
    }

    fn embedded_source(&self) -> Option<&EmbeddedSource> {
        self.embedded_source.as_ref()
    }
}

/// Captured representation of one local binding.
///
/// Besides the display `repr`, a value may describe itself as an array (shape + element type)
/// so framework plugins can pick it up. `items` holds the direct children of simple containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalValue {
    repr: String,
    type_path: String,
    shape: Option<Vec<usize>>,
    dtype: Option<String>,
    device: Option<String>,
    is_tracer: bool,
    tracer_level: Option<u32>,
    items: Vec<LocalValue>,
}

impl LocalValue {
    #[must_use]
    pub fn new(repr: impl Into<String>) -> Self {
        Self {
            repr: repr.into(),
            type_path: String::new(),
            shape: None,
            dtype: None,
            device: None,
            is_tracer: false,
            tracer_level: None,
            items: Vec::new(),
        }
    }

    /// Captures `value` through its `Debug` output and records its Rust type path.
    #[must_use]
    pub fn debug<T: std::fmt::Debug + ?Sized>(value: &T) -> Self {
        Self::new(format!("{value:?}")).with_type_path(std::any::type_name::<T>())
    }

    #[must_use]
    pub fn with_type_path(mut self, type_path: impl Into<String>) -> Self {
        self.type_path = type_path.into();
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: impl IntoIterator<Item = usize>) -> Self {
        self.shape = Some(shape.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    #[must_use]
    pub fn as_tracer(mut self, level: Option<u32>) -> Self {
        self.is_tracer = true;
        self.tracer_level = level;
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: Vec<LocalValue>) -> Self {
        self.items = items;
        self
    }

    #[must_use]
    pub fn repr(&self) -> &str {
        &self.repr
    }

    #[must_use]
    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    #[must_use]
    pub fn shape(&self) -> Option<&[usize]> {
        self.shape.as_deref()
    }

    #[must_use]
    pub fn dtype(&self) -> Option<&str> {
        self.dtype.as_deref()
    }

    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    #[must_use]
    pub fn is_tracer(&self) -> bool {
        self.is_tracer
    }

    #[must_use]
    pub fn tracer_level(&self) -> Option<u32> {
        self.tracer_level
    }

    #[must_use]
    pub fn items(&self) -> &[LocalValue] {
        &self.items
    }

    pub(crate) fn map_repr(mut self, f: &impl Fn(&str) -> String) -> Self {
        self.repr = f(&self.repr);
        self.items = self.items.into_iter().map(|item| item.map_repr(f)).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{CapturedFrame, FrameReference, LocalValue, Locals};

    #[test]
    fn debug_capture_records_repr_and_type_path() {
        let value = LocalValue::debug(&vec![1_u8, 2]);
        assert_eq!(value.repr(), "[1, 2]");
        assert_eq!(value.type_path(), "alloc::vec::Vec<u8>");
        assert!(value.shape().is_none());
    }

    #[test]
    fn with_local_creates_binding_map_on_first_use() {
        let frame = CapturedFrame::new("main", "src/main.rs", 3);
        assert!(frame.locals().is_none());

        let frame = frame.with_local("x", LocalValue::new("1"));
        assert_eq!(frame.locals().map(|locals| locals.len()), Some(1));
    }

    #[test]
    fn locals_keep_capture_order_and_replace_in_place() {
        let frame = CapturedFrame::new("main", "src/main.rs", 3)
            .with_local("zeta", LocalValue::new("1"))
            .with_local("alpha", LocalValue::new("2"))
            .with_local("mid", LocalValue::new("3"))
            .with_local("zeta", LocalValue::new("4"));

        let locals = frame.locals().cloned().unwrap_or_default();
        let names = locals.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(locals.get("zeta").map(LocalValue::repr), Some("4"));

        let collected = locals.into_iter().rev().collect::<Locals>();
        assert_eq!(collected.get("alpha").map(LocalValue::repr), Some("2"));
        assert_eq!(collected.iter().next().map(|(name, _)| name.as_str()), Some("mid"));
    }
}
