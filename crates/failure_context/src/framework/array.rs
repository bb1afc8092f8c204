use std::fmt::{self, Write as _};

use super::{is_loaded, loaded_version, Framework, FrameworkContext};
use crate::frame::LocalValue;
use crate::model::SourceCodeBundle;

/// Coarse program transformation inferred from an enclosing function name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationType {
    Vectorize,
    Parallelize,
    Compile,
    Differentiate,
}

impl TransformationType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vectorize => "vectorize",
            Self::Parallelize => "parallelize",
            Self::Compile => "compile",
            Self::Differentiate => "differentiate",
        }
    }
}

impl fmt::Display for TransformationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const TRANSFORMATION_MARKERS: &[(TransformationType, &[&str])] = &[
    (TransformationType::Vectorize, &["vmap", "batched"]),
    (TransformationType::Parallelize, &["pmap", "parallel"]),
    (TransformationType::Compile, &["jit", "compiled", "xla"]),
    (TransformationType::Differentiate, &["grad", "vjp", "jvp"]),
];

/// First transformation whose marker occurs in `function_name`, case-insensitively.
#[must_use]
pub fn detect_transformation(function_name: &str) -> Option<TransformationType> {
    let lower = function_name.to_lowercase();
    TRANSFORMATION_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| lower.contains(marker)))
        .map(|(kind, _)| *kind)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayMetadata {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub device: String,
    pub is_tracer: bool,
    pub tracer_level: Option<u32>,
}

/// Array metadata for `value` when it exposes a shape and element type and its type lives
/// under `namespace`.
#[must_use]
pub fn extract_array_metadata(
    name: &str,
    value: &LocalValue,
    namespace: &str,
) -> Option<ArrayMetadata> {
    let shape = value.shape()?;
    let dtype = value.dtype()?;
    if !in_namespace(value.type_path(), namespace) {
        return None;
    }

    Some(ArrayMetadata {
        name: name.to_string(),
        shape: shape.to_vec(),
        dtype: dtype.to_string(),
        device: value.device().unwrap_or("unknown").to_string(),
        is_tracer: value.is_tracer(),
        tracer_level: value.tracer_level().filter(|_| value.is_tracer()),
    })
}

fn in_namespace(type_path: &str, namespace: &str) -> bool {
    !namespace.is_empty()
        && type_path
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Key,
    Subkey,
}

impl KeyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Subkey => "subkey",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub name: String,
    pub kind: KeyKind,
    pub was_split: bool,
}

/// Classifies `value` as a random key by element type and shape, refined by the binding name.
///
/// Best-effort: a typed key element (`*key*`), a legacy `u32` pair, or a batch of `u32` pairs.
#[must_use]
pub fn extract_key_metadata(name: &str, value: &LocalValue) -> Option<KeyMetadata> {
    let shape = value.shape()?;
    let dtype = value.dtype()?;

    let is_u32 = matches!(dtype, "uint32" | "u32");
    let is_key = dtype.to_lowercase().contains("key")
        || (is_u32 && shape == [2])
        || (is_u32 && shape.len() == 2 && shape.last() == Some(&2));
    if !is_key {
        return None;
    }

    let lower = name.to_lowercase();
    Some(KeyMetadata {
        name: name.to_string(),
        kind: if lower.contains("sub") {
            KeyKind::Subkey
        } else {
            KeyKind::Key
        },
        was_split: shape.len() > 1 || lower.contains("split"),
    })
}

/// Metadata found in one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayFrameContext {
    pub arrays: Vec<ArrayMetadata>,
    pub keys: Vec<KeyMetadata>,
    pub transformation: Option<TransformationType>,
    pub is_tracing: bool,
}

impl ArrayFrameContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty() && self.keys.is_empty() && self.transformation.is_none()
    }
}

/// Describes one array framework to the generic array plugin.
#[derive(Debug, Clone)]
pub struct FrameworkProfile {
    pub name: String,
    /// Used when the host announced the framework without a version.
    pub version: String,
    /// Type-path prefix every array value of this framework carries.
    pub namespace: String,
    pub default_backend: String,
    pub tracing_probe: fn() -> bool,
}

fn never_tracing() -> bool {
    false
}

impl FrameworkProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "unknown".to_string(),
            namespace: namespace.into(),
            default_backend: "cpu".to_string(),
            tracing_probe: never_tracing,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_default_backend(mut self, backend: impl Into<String>) -> Self {
        self.default_backend = backend.into();
        self
    }

    #[must_use]
    pub fn with_tracing_probe(mut self, probe: fn() -> bool) -> Self {
        self.tracing_probe = probe;
        self
    }
}

/// Reference plugin: array shapes, random keys and transformation tags.
#[derive(Debug, Clone)]
pub struct ArrayFramework {
    profile: FrameworkProfile,
}

impl ArrayFramework {
    #[must_use]
    pub fn new(profile: FrameworkProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn profile(&self) -> &FrameworkProfile {
        &self.profile
    }

    /// Metadata for one frame. Keys are checked before arrays; direct children of containers
    /// are inspected as `name[i]`.
    #[must_use]
    pub fn extract_frame(&self, bundle: &SourceCodeBundle, is_tracing: bool) -> ArrayFrameContext {
        let mut frame = ArrayFrameContext {
            transformation: detect_transformation(&bundle.function_name),
            is_tracing,
            ..ArrayFrameContext::default()
        };

        let Some(locals) = bundle.local_vars.as_ref() else {
            return frame;
        };

        for (name, value) in locals {
            if name.starts_with("__") {
                continue;
            }
            self.classify(name, value, &mut frame);
            for (index, item) in value.items().iter().enumerate() {
                self.classify(&format!("{name}[{index}]"), item, &mut frame);
            }
        }

        frame
    }

    fn classify(&self, name: &str, value: &LocalValue, frame: &mut ArrayFrameContext) {
        if let Some(key) = extract_key_metadata(name, value) {
            frame.keys.push(key);
        } else if let Some(array) = extract_array_metadata(name, value, &self.profile.namespace) {
            frame.arrays.push(array);
        }
    }
}

impl Framework for ArrayFramework {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn detect(&self) -> bool {
        is_loaded(&self.profile.name)
    }

    fn extract_context(&self, bundles: &[SourceCodeBundle]) -> Option<Box<dyn FrameworkContext>> {
        let is_tracing = (self.profile.tracing_probe)();
        let frames = bundles
            .iter()
            .map(|bundle| self.extract_frame(bundle, is_tracing))
            .collect::<Vec<_>>();

        if frames.iter().all(ArrayFrameContext::is_empty) {
            return None;
        }

        Some(Box::new(ArrayFrameworkContext {
            name: self.profile.name.clone(),
            version: loaded_version(&self.profile.name)
                .unwrap_or_else(|| self.profile.version.clone()),
            default_backend: self.profile.default_backend.clone(),
            frames,
        }))
    }
}

/// Output of [`ArrayFramework`], one entry per frame of the full chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayFrameworkContext {
    pub name: String,
    pub version: String,
    pub default_backend: String,
    pub frames: Vec<ArrayFrameContext>,
}

impl FrameworkContext for ArrayFrameworkContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn frame_context_string(&self, index: usize) -> Option<String> {
        let frame = self.frames.get(index).filter(|frame| !frame.is_empty())?;
        let root = format!("{}_frame_context", self.name);

        let mut out = String::new();
        let _ = write!(
            out,
            "<{root} version=\"{}\" default_backend=\"{}\"",
            escape(&self.version),
            escape(&self.default_backend)
        );
        if frame.is_tracing {
            out.push_str(" is_tracing=\"true\"");
        }
        out.push_str(">\n");

        for array in &frame.arrays {
            let _ = write!(
                out,
                "  <array name=\"{}\" shape=\"{}\" dtype=\"{}\" device=\"{}\"",
                escape(&array.name),
                format_shape(&array.shape),
                escape(&array.dtype),
                escape(&array.device)
            );
            if array.is_tracer {
                out.push_str(" is_tracer=\"true\"");
                if let Some(level) = array.tracer_level {
                    let _ = write!(out, " tracer_level=\"{level}\"");
                }
            }
            out.push_str(" />\n");
        }

        for key in &frame.keys {
            let _ = write!(
                out,
                "  <prng_key name=\"{}\" key_type=\"{}\"",
                escape(&key.name),
                key.kind.as_str()
            );
            if key.was_split {
                out.push_str(" was_split=\"true\"");
            }
            out.push_str(" />\n");
        }

        if let Some(transformation) = frame.transformation {
            let _ = writeln!(
                out,
                "  <transformation_context>{transformation}</transformation_context>"
            );
        }

        let _ = write!(out, "</{root}>");
        Some(out)
    }
}

/// Tuple notation: `()`, `(2,)`, `(3, 4)`.
fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({single},)"),
        dims => {
            let parts = dims.iter().map(usize::to_string).collect::<Vec<_>>();
            format!("({})", parts.join(", "))
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{detect_transformation, format_shape, TransformationType};

    #[test]
    fn first_matching_marker_wins() {
        assert_eq!(detect_transformation("batched_jit_step"), Some(TransformationType::Vectorize));
        assert_eq!(detect_transformation("Compiled_Loss"), Some(TransformationType::Compile));
        assert_eq!(
            detect_transformation("value_and_grad"),
            Some(TransformationType::Differentiate)
        );
        assert_eq!(detect_transformation("train_step"), None);
    }

    #[test]
    fn shapes_use_tuple_notation() {
        assert_eq!(format_shape(&[]), "()");
        assert_eq!(format_shape(&[2]), "(2,)");
        assert_eq!(format_shape(&[3, 4]), "(3, 4)");
    }
}
