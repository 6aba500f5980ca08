//! Kernel sources handed to the library compile stage.
//!
//! Metal compiles MSL text at run time. WGSL is accepted too: it is parsed
//! and validated with naga and translated to MSL before compilation, with
//! buffers bound to sequential `[[buffer(N)]]` slots in `(group, binding)`
//! order.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{ComputeError, Result};

/// Where the kernel library comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelSource {
    /// Metal Shading Language text, compiled at run time.
    Msl(String),
    /// WGSL text, translated to MSL and then compiled.
    Wgsl(String),
    /// A precompiled `.metallib`.
    Metallib(Vec<u8>),
    /// The `default.metallib` bundled with the application.
    DefaultLibrary,
}

/// What the library stage receives after preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryInput<'s> {
    Source(Cow<'s, str>),
    Data(&'s [u8]),
    Default,
}

/// A kernel ready for the library and function stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedKernel<'s> {
    pub library: LibraryInput<'s>,
    /// Entry point name as it appears in the compiled library.
    pub entry_point: String,
}

impl KernelSource {
    /// Load a kernel file, choosing the kind by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("metal") | Some("msl") => Ok(Self::Msl(std::fs::read_to_string(path)?)),
            Some("wgsl") => Ok(Self::Wgsl(std::fs::read_to_string(path)?)),
            Some("metallib") => Ok(Self::Metallib(std::fs::read(path)?)),
            _ => Err(ComputeError::UnsupportedKernelFile {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Msl(_) => "msl",
            Self::Wgsl(_) => "wgsl",
            Self::Metallib(_) => "metallib",
            Self::DefaultLibrary => "default library",
        }
    }

    /// Translate if needed and resolve the entry point name.
    pub fn prepare(&self, entry_point: &str) -> Result<PreparedKernel<'_>> {
        match self {
            Self::Msl(text) => Ok(PreparedKernel {
                library: LibraryInput::Source(Cow::Borrowed(text)),
                entry_point: entry_point.to_string(),
            }),
            Self::Wgsl(text) => {
                let translated = translate_wgsl(text)?;
                let msl_name = translated
                    .msl_entry_point(entry_point)
                    .ok_or_else(|| ComputeError::FunctionNotFound {
                        name: entry_point.to_string(),
                        available: translated.entry_points.keys().cloned().collect(),
                    })?
                    .to_string();
                Ok(PreparedKernel {
                    library: LibraryInput::Source(Cow::Owned(translated.msl)),
                    entry_point: msl_name,
                })
            }
            Self::Metallib(bytes) => Ok(PreparedKernel {
                library: LibraryInput::Data(bytes),
                entry_point: entry_point.to_string(),
            }),
            Self::DefaultLibrary => Ok(PreparedKernel {
                library: LibraryInput::Default,
                entry_point: entry_point.to_string(),
            }),
        }
    }
}

/// MSL produced from WGSL.
#[derive(Debug, Clone)]
pub struct TranslatedKernel {
    pub msl: String,
    /// Compute entry points: WGSL name to MSL name.
    pub entry_points: BTreeMap<String, String>,
}

impl TranslatedKernel {
    pub fn msl_entry_point(&self, wgsl_name: &str) -> Option<&str> {
        self.entry_points.get(wgsl_name).map(String::as_str)
    }
}

/// Parse, validate and translate a WGSL module to MSL.
pub fn translate_wgsl(source: &str) -> Result<TranslatedKernel> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| ComputeError::Transpile(e.emit_to_string(source)))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ComputeError::Transpile(format!("validation failed: {e}")))?;

    let binding_map = build_msl_binding_map(&module);
    let per_entry_point_map = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == naga::ShaderStage::Compute)
        .map(|ep| {
            (
                ep.name.clone(),
                naga::back::msl::EntryPointResources {
                    resources: binding_map.clone(),
                    push_constant_buffer: None,
                    sizes_buffer: None,
                },
            )
        })
        .collect();

    let (msl, translation) = naga::back::msl::write_string(
        &module,
        &info,
        &naga::back::msl::Options {
            lang_version: (2, 0),
            per_entry_point_map,
            fake_missing_bindings: false,
            ..Default::default()
        },
        &naga::back::msl::PipelineOptions::default(),
    )
    .map_err(|e| ComputeError::Transpile(e.to_string()))?;

    let mut entry_points = BTreeMap::new();
    for (ep, name) in module.entry_points.iter().zip(translation.entry_point_names) {
        if ep.stage != naga::ShaderStage::Compute {
            continue;
        }
        let name = name.map_err(|e| {
            ComputeError::Transpile(format!("entry point `{}`: {e}", ep.name))
        })?;
        entry_points.insert(ep.name.clone(), name);
    }

    debug!(
        entry_points = ?entry_points,
        bytes = msl.len(),
        "translated WGSL to MSL"
    );
    Ok(TranslatedKernel { msl, entry_points })
}

/// Assign Metal slots to the module's resource bindings.
///
/// Bindings are visited in `(group, binding)` order; textures get
/// `[[texture(N)]]`, samplers `[[sampler(N)]]` and everything else
/// (storage and uniform buffers) `[[buffer(N)]]`, each counting from zero.
fn build_msl_binding_map(
    module: &naga::Module,
) -> BTreeMap<naga::ResourceBinding, naga::back::msl::BindTarget> {
    let mut bindings: Vec<_> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.clone()?;
            Some((binding, &module.types[var.ty].inner))
        })
        .collect();
    bindings.sort_by_key(|(binding, _)| (binding.group, binding.binding));

    let (mut textures, mut samplers, mut buffers) = (0u8, 0u8, 0u8);
    let mut map = BTreeMap::new();
    for (binding, inner) in bindings {
        let target = match inner {
            naga::TypeInner::Image { .. } => {
                textures += 1;
                naga::back::msl::BindTarget {
                    texture: Some(textures - 1),
                    ..Default::default()
                }
            }
            naga::TypeInner::Sampler { .. } => {
                samplers += 1;
                naga::back::msl::BindTarget {
                    sampler: Some(naga::back::msl::BindSamplerTarget::Resource(samplers - 1)),
                    ..Default::default()
                }
            }
            _ => {
                buffers += 1;
                naga::back::msl::BindTarget {
                    buffer: Some(buffers - 1),
                    ..Default::default()
                }
            }
        };
        map.insert(binding, target);
    }
    map
}
