//! Output reconciler for harvested fragments
//!
//! Loads the fragment heat wrote, locates the generated
//! Directory/Component/File triple, rewrites the tool-generated identifiers
//! to the caller's identifiers with a structural tree walk, and extracts the
//! registry-entry children destined for the caller's File and Component
//! elements.

use crate::element::WxsElement;
use crate::{ComRegError, Result};
use std::path::Path;

/// Caller-assigned identifiers the generated ones are rewritten to
#[derive(Debug, Clone)]
pub struct TargetIds {
    pub file: String,
    pub component: String,
    pub directory: String,
}

/// Child subtrees harvested for the File and Component scopes,
/// post-identifier-rewrite
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub file_children: Vec<WxsElement>,
    pub component_children: Vec<WxsElement>,
}

impl ExtractionResult {
    /// True when the binary exposed no registration data at all
    pub fn is_empty(&self) -> bool {
        self.file_children.is_empty() && self.component_children.is_empty()
    }
}

/// Reconcile the fragment at `path` against the caller's identifiers.
///
/// The first Component in document order wins; heat emits exactly one per
/// `file` harvest. An unparseable fragment or one without a Component is
/// fatal for the request: it means the tool produced an unusable document.
pub fn reconcile(path: &Path, ids: &TargetIds) -> Result<ExtractionResult> {
    let text = std::fs::read_to_string(path)?;
    let doc = roxmltree::Document::parse(&text).map_err(|e| ComRegError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let component_node = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "Component")
        .ok_or_else(|| ComRegError::NoComponent(path.display().to_string()))?;

    let directory_node = component_node
        .parent()
        .filter(|p| p.is_element())
        .ok_or_else(|| {
            ComRegError::UnexpectedStructure("Component has no parent Directory".to_string())
        })?;

    let file_node = component_node
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "File")
        .ok_or_else(|| {
            ComRegError::UnexpectedStructure("Component has no File child".to_string())
        })?;

    let renames = vec![
        (generated_id(file_node)?, ids.file.clone()),
        (generated_id(component_node)?, ids.component.clone()),
        (generated_id(directory_node)?, ids.directory.clone()),
    ];

    let mut directory = WxsElement::from_node(directory_node);
    directory.rewrite_ids(&renames);

    // Identifiers changed, structure did not: re-locate within the rewrite.
    let component = directory.find_first_mut("Component").ok_or_else(|| {
        ComRegError::UnexpectedStructure("Component lost during identifier rewrite".to_string())
    })?;
    let file = component.take_child("File").ok_or_else(|| {
        ComRegError::UnexpectedStructure("File lost during identifier rewrite".to_string())
    })?;

    Ok(ExtractionResult {
        file_children: file.children,
        component_children: std::mem::take(&mut component.children),
    })
}

fn generated_id(node: roxmltree::Node) -> Result<String> {
    node.attribute("Id")
        .map(|id| id.to_string())
        .ok_or_else(|| {
            ComRegError::UnexpectedStructure(format!(
                "{} element has no Id attribute",
                node.tag_name().name()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const HEAT_OUTPUT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Wix xmlns="http://schemas.microsoft.com/wix/2006/wi">
    <Fragment>
        <DirectoryRef Id="TARGETDIR">
            <Directory Id="dir53E5B0F4" Name="SourceDir">
                <Component Id="cmpD9A4E0F1" Guid="{8E2A5CFA-3F9E-4C84-A1E6-2E3B9C0D41A7}">
                    <File Id="filA5C32884" KeyPath="yes" Source="SourceDir\CSScriptLibrary.dll">
                        <TypeLib Id="{C52C53F8-32F9-4A57-A9C5-90F4A2D3BC08}" Description="CSScriptLibrary" HelpDirectory="dir53E5B0F4" Language="0" MajorVersion="1" MinorVersion="0" />
                    </File>
                    <RegistryValue Root="HKCR" Key="CLSID\{D8D90C29-0E31-4C91-9A2B-6E5F3C8D7A10}\InprocServer32" Value="mscoree.dll" Type="string" Action="write" />
                    <RegistryValue Root="HKCR" Key="CLSID\{D8D90C29-0E31-4C91-9A2B-6E5F3C8D7A10}\InprocServer32" Name="CodeBase" Value="file:///[#filA5C32884]" Type="string" Action="write" />
                </Component>
            </Directory>
        </DirectoryRef>
    </Fragment>
</Wix>"#;

    fn target_ids() -> TargetIds {
        TargetIds {
            file: "CSScriptLibrary_dll".to_string(),
            component: "CSScriptLibrary_dll_comp".to_string(),
            directory: "INSTALLDIR".to_string(),
        }
    }

    fn write_fixture(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("CSScriptLibrary.dll.wxs");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reconcile_splits_file_and_component_children() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), HEAT_OUTPUT);

        let result = reconcile(&path, &target_ids()).unwrap();

        assert_eq!(result.file_children.len(), 1);
        assert_eq!(result.file_children[0].name, "TypeLib");
        assert_eq!(result.component_children.len(), 2);
        assert!(result
            .component_children
            .iter()
            .all(|c| c.name == "RegistryValue"));
    }

    #[test]
    fn test_reconcile_does_not_keep_file_element() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), HEAT_OUTPUT);

        let result = reconcile(&path, &target_ids()).unwrap();

        assert!(result.component_children.iter().all(|c| c.name != "File"));
    }

    #[test]
    fn test_reconcile_rewrites_embedded_file_reference() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), HEAT_OUTPUT);

        let result = reconcile(&path, &target_ids()).unwrap();

        let codebase = result
            .component_children
            .iter()
            .find(|c| c.attr("Name") == Some("CodeBase"))
            .unwrap();
        assert_eq!(
            codebase.attr("Value"),
            Some("file:///[#CSScriptLibrary_dll]")
        );
    }

    #[test]
    fn test_reconcile_rewrites_directory_reference() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), HEAT_OUTPUT);

        let result = reconcile(&path, &target_ids()).unwrap();

        assert_eq!(
            result.file_children[0].attr("HelpDirectory"),
            Some("INSTALLDIR")
        );
    }

    #[test]
    fn test_reconcile_rewrite_is_total() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), HEAT_OUTPUT);

        let result = reconcile(&path, &target_ids()).unwrap();

        let serialized: String = result
            .file_children
            .iter()
            .chain(result.component_children.iter())
            .map(|c| c.to_wxs())
            .collect();
        assert!(!serialized.contains("filA5C32884"));
        assert!(!serialized.contains("cmpD9A4E0F1"));
        assert!(!serialized.contains("dir53E5B0F4"));
    }

    #[test]
    fn test_reconcile_no_registration_data() {
        let dir = tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            r#"<Wix><Fragment><DirectoryRef Id="TARGETDIR"><Directory Id="dir1" Name="SourceDir"><Component Id="cmp1"><File Id="fil1" KeyPath="yes" Source="SourceDir\plain.dll" /></Component></Directory></DirectoryRef></Fragment></Wix>"#,
        );

        let result = reconcile(&path, &target_ids()).unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_reconcile_first_component_wins() {
        let dir = tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            r#"<Wix><Directory Id="dir1"><Component Id="cmp1"><File Id="fil1" /><RegistryValue Root="HKCR" Key="first" Value="1" Type="string" /></Component><Component Id="cmp2"><File Id="fil2" /><RegistryValue Root="HKCR" Key="second" Value="2" Type="string" /></Component></Directory></Wix>"#,
        );

        let result = reconcile(&path, &target_ids()).unwrap();

        assert_eq!(result.component_children.len(), 1);
        assert_eq!(result.component_children[0].attr("Key"), Some("first"));
    }

    #[test]
    fn test_reconcile_malformed_xml() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), "<Wix><Fragment></Wix>");

        let err = reconcile(&path, &target_ids()).unwrap_err();
        assert!(matches!(err, ComRegError::ParseError { .. }));
    }

    #[test]
    fn test_reconcile_no_component() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), "<Wix><Fragment /></Wix>");

        let err = reconcile(&path, &target_ids()).unwrap_err();
        assert!(matches!(err, ComRegError::NoComponent(_)));
    }

    #[test]
    fn test_reconcile_component_without_parent() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), r#"<Component Id="cmp1"><File Id="fil1" /></Component>"#);

        let err = reconcile(&path, &target_ids()).unwrap_err();
        assert!(matches!(err, ComRegError::UnexpectedStructure(_)));
    }

    #[test]
    fn test_reconcile_component_without_file() {
        let dir = tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            r#"<Directory Id="dir1"><Component Id="cmp1" /></Directory>"#,
        );

        let err = reconcile(&path, &target_ids()).unwrap_err();
        assert!(matches!(err, ComRegError::UnexpectedStructure(_)));
    }

    #[test]
    fn test_reconcile_missing_id_attribute() {
        let dir = tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            r#"<Directory Id="dir1"><Component><File Id="fil1" /></Component></Directory>"#,
        );

        let err = reconcile(&path, &target_ids()).unwrap_err();
        assert!(matches!(err, ComRegError::UnexpectedStructure(_)));
    }

    #[test]
    fn test_reconcile_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never-written.wxs");

        let err = reconcile(&path, &target_ids()).unwrap_err();
        assert!(matches!(err, ComRegError::Io(_)));
    }
}
