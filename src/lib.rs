//! Build-time COM registration harvesting for WiX
//!
//! Drives the WiX harvester (heat) against a single binary, captures the
//! registry entries it discovers, and merges them into the caller's WXS
//! element tree under the caller's file/component/directory identifiers.
//! This replaces install-time self-registration with build-time extraction.
//!
//! Each registration runs Invoke -> Reconcile -> Splice -> Cleanup,
//! strictly sequential with no retries; any fatal step aborts the request
//! with the target tree unmodified.
//!
//! # Example
//!
//! ```no_run
//! use wix_comreg::{BuildContext, ComHarvester, HeatTool, TargetContext, WxsElement};
//!
//! let mut file = WxsElement::new("File")
//!     .with_attr("Id", "CSScriptLibrary_dll")
//!     .with_attr("Source", "CSScriptLibrary.dll");
//! let mut component = WxsElement::new("Component").with_attr("Id", "CSScriptLibrary_dll_comp");
//!
//! let ctx = BuildContext::new(".", "wix");
//! let harvester = ComHarvester::new(HeatTool::detect().unwrap());
//! harvester
//!     .register(
//!         &ctx,
//!         TargetContext {
//!             file: &mut file,
//!             component: &mut component,
//!             directory_id: "INSTALLDIR",
//!         },
//!     )
//!     .unwrap();
//!
//! println!("{}", component.to_wxs());
//! ```

pub mod element;
pub mod heat;
pub mod reconcile;
pub mod splice;

pub use element::WxsElement;
pub use heat::{harvest_args, ComHarvestOptions, HeatOutput, HeatTool};
pub use reconcile::{reconcile, ExtractionResult, TargetIds};
pub use splice::{cleanup_output, splice};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Registration errors
#[derive(Error, Debug)]
pub enum ComRegError {
    #[error("heat not found. Install the WiX Toolset from https://wixtoolset.org/")]
    ToolNotFound,

    #[error("Harvesting failed: {0}")]
    HarvestFailed(String),

    #[error("Failed to parse harvested fragment {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("No Component element in harvested fragment: {0}")]
    NoComponent(String),

    #[error("Unexpected fragment structure: {0}")]
    UnexpectedStructure(String),

    #[error("Target {element} element has no {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ComRegError>;

/// Build-level settings a registration reads: where sources live, where
/// temporary fragments land, and whether they are retained afterwards.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Base directory relative `Source` attributes resolve against
    pub source_dir: PathBuf,
    /// Directory the temporary `.wxs` fragments are written to
    pub output_dir: PathBuf,
    /// Retain temporary fragments for the whole build
    pub preserve_temp_files: bool,
    /// Retain temporary fragments for the current package
    pub preserve_package_temp_files: bool,
}

impl BuildContext {
    pub fn new<S: AsRef<Path>, O: AsRef<Path>>(source_dir: S, output_dir: O) -> Self {
        Self {
            source_dir: source_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            preserve_temp_files: false,
            preserve_package_temp_files: false,
        }
    }

    /// Retain temporary fragments build-wide
    pub fn preserve_temp_files(mut self, keep: bool) -> Self {
        self.preserve_temp_files = keep;
        self
    }

    /// Retain temporary fragments for this package
    pub fn preserve_package_temp_files(mut self, keep: bool) -> Self {
        self.preserve_package_temp_files = keep;
        self
    }

    /// Either preserve flag suffices to keep the artifacts
    pub fn keep_temp_files(&self) -> bool {
        self.preserve_temp_files || self.preserve_package_temp_files
    }

    /// Resolve a `Source` attribute against the base source directory
    pub fn resolve_source(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.source_dir.join(path)
        }
    }

    /// Temporary fragment path for a source binary. Named after the source
    /// file so concurrent registrations of distinct files never collide.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.output_dir.join(format!("{}.wxs", name))
    }
}

/// Mutable handles into the caller's in-progress document: the File element
/// being registered, its parent Component, and that Component's parent
/// Directory id. File and Component gain child nodes; nothing else changes.
#[derive(Debug)]
pub struct TargetContext<'a> {
    pub file: &'a mut WxsElement,
    pub component: &'a mut WxsElement,
    pub directory_id: &'a str,
}

/// COM registration harvester
pub struct ComHarvester {
    tool: HeatTool,
    options: ComHarvestOptions,
}

impl ComHarvester {
    /// Create a harvester with default options
    pub fn new(tool: HeatTool) -> Self {
        Self::with_options(tool, ComHarvestOptions::default())
    }

    /// Create a harvester with explicit options
    pub fn with_options(tool: HeatTool, options: ComHarvestOptions) -> Self {
        Self { tool, options }
    }

    /// Options in effect
    pub fn options(&self) -> &ComHarvestOptions {
        &self.options
    }

    /// Extract COM registration metadata for the target's source binary and
    /// merge it into the target File and Component elements.
    ///
    /// The target File must carry `Id` and `Source` attributes and the
    /// Component an `Id`; the identifiers heat generates are rewritten to
    /// these before splicing. The temporary fragment is removed afterwards
    /// unless the context retains it.
    pub fn register(&self, ctx: &BuildContext, target: TargetContext) -> Result<()> {
        let file_id = required_attr(target.file, "File", "Id")?.to_string();
        let source = required_attr(target.file, "File", "Source")?.to_string();
        let component_id = required_attr(target.component, "Component", "Id")?.to_string();

        let source_path = ctx.resolve_source(&source);
        let output_path = ctx.output_path_for(&source_path);

        self.tool.run(&source_path, &output_path, &self.options)?;

        let ids = TargetIds {
            file: file_id,
            component: component_id,
            directory: target.directory_id.to_string(),
        };
        let result = reconcile(&output_path, &ids)?;

        splice(result, target.file, target.component);
        cleanup_output(&output_path, ctx.keep_temp_files());

        Ok(())
    }
}

fn required_attr<'a>(
    element: &'a WxsElement,
    name: &'static str,
    attribute: &'static str,
) -> Result<&'a str> {
    element.attr(attribute).ok_or(ComRegError::MissingAttribute {
        element: name,
        attribute,
    })
}
