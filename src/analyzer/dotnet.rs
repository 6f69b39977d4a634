use std::collections::HashSet;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use super::{parse_error, read_manifest};
use crate::error::NoticeError;
use crate::models::{Dependency, Ecosystem};

/// Analyzer for .NET projects using NuGet.
///
/// Accepts a project file (`*.csproj`, `*.fsproj`, `*.vbproj`) or a solution
/// (`*.sln`), which stands for every project it references. For each project:
/// - `<PackageReference>` elements, with the version as attribute or child element
/// - a legacy `packages.config` next to the project file
/// - versions replaced by what restore resolved, from `obj/project.assets.json`
///   (covers central package management, floating and range versions)
///
/// Duplicates across projects are dropped, first occurrence wins.
pub struct DotNetAnalyzer;

impl DotNetAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for DotNetAnalyzer {
    fn analyze(&self, manifest: &Path) -> Result<Vec<Dependency>, NoticeError> {
        let projects = if is_solution(manifest) {
            solution_projects(manifest)?
        } else {
            if !manifest.is_file() {
                return Err(NoticeError::ManifestNotFound {
                    path: manifest.to_path_buf(),
                });
            }
            vec![manifest.to_path_buf()]
        };

        let mut deps: Vec<Dependency> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for project in projects {
            let mut found = parse_project_file(&project)?;

            let packages_config = project.with_file_name("packages.config");
            if packages_config.is_file() {
                found.extend(parse_packages_config(&packages_config)?);
            }

            resolve_versions_from_assets(&project, &mut found);

            for d in found {
                if seen.insert((d.name.to_lowercase(), d.version.to_lowercase())) {
                    deps.push(d);
                }
            }
        }

        Ok(deps)
    }
}

fn is_solution(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("sln"))
        .unwrap_or(false)
}

fn is_project_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".csproj") || lower.ends_with(".fsproj") || lower.ends_with(".vbproj")
}

/// Project files referenced by a solution, resolved against its directory.
/// References to projects that are not on disk are skipped.
fn solution_projects(sln: &Path) -> Result<Vec<PathBuf>, NoticeError> {
    let content = read_manifest(sln)?;
    // Project("{FAE04EC0-...}") = "App", "src\App\App.csproj", "{...}"
    let re = Regex::new(r#"^Project\("\{[^}]*\}"\)\s*=\s*"[^"]*"\s*,\s*"([^"]+)""#)
        .map_err(|e| parse_error(sln, e))?;
    let base = sln.parent().unwrap_or_else(|| Path::new("."));

    let mut projects = Vec::new();
    for line in content.lines() {
        let Some(caps) = re.captures(line.trim_start()) else {
            continue;
        };
        let relative = caps[1].replace('\\', "/");
        if !is_project_file(&relative) {
            continue;
        }
        let path = base.join(&relative);
        if path.is_file() {
            projects.push(path);
        } else {
            log::warn!("{}: referenced project {} not found", sln.display(), relative);
        }
    }
    Ok(projects)
}

fn make_dep(name: &str, version: &str) -> Dependency {
    Dependency::new(name.trim(), version.trim(), Ecosystem::NuGet)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let val = attr.unescape_value().unwrap_or_default().into_owned();
            (key, val)
        })
        .collect()
}

/// `Include` and `Version` attributes of a `<PackageReference>`.
fn package_reference(e: &BytesStart) -> (String, String) {
    let mut name = String::new();
    let mut version = String::new();
    for (key, val) in attributes(e) {
        match key.as_str() {
            "Include" => name = val,
            "Version" => version = val,
            _ => {}
        }
    }
    (name, version)
}

/// `<PackageReference Include="..." Version="..." />`, or with a nested
/// `<Version>` element.
fn parse_project_file(path: &Path) -> Result<Vec<Dependency>, NoticeError> {
    let content = read_manifest(path)?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    let mut buf = Vec::new();
    // (name, version) of the PackageReference currently open.
    let mut open: Option<(String, String)> = None;
    let mut in_version = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| parse_error(path, e))? {
            Event::Empty(ref e) if local_name(e) == "PackageReference" => {
                let (name, version) = package_reference(e);
                if !name.is_empty() {
                    deps.push(make_dep(&name, &version));
                }
            }
            Event::Start(ref e) => match local_name(e).as_str() {
                "PackageReference" => open = Some(package_reference(e)),
                "Version" if open.is_some() => in_version = true,
                _ => {}
            },
            Event::Text(ref e) if in_version => {
                if let Some((_, version)) = open.as_mut() {
                    *version = e.unescape().map_err(|err| parse_error(path, err))?.into_owned();
                }
            }
            Event::End(ref e) => match String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned().as_str() {
                "Version" => in_version = false,
                "PackageReference" => {
                    if let Some((name, version)) = open.take() {
                        if !name.is_empty() {
                            deps.push(make_dep(&name, &version));
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(deps)
}

/// Parse `<package id="..." version="..." />` from `packages.config`.
fn parse_packages_config(path: &Path) -> Result<Vec<Dependency>, NoticeError> {
    let content = read_manifest(path)?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| parse_error(path, e))? {
            Event::Empty(ref e) | Event::Start(ref e) => {
                if local_name(e) == "package" {
                    let mut id = String::new();
                    let mut version = String::new();
                    for (key, val) in attributes(e) {
                        match key.as_str() {
                            "id" => id = val,
                            "version" => version = val,
                            _ => {}
                        }
                    }
                    if !id.is_empty() {
                        deps.push(make_dep(&id, &version));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(deps)
}

/// Replace declared versions with the ones restore resolved, read from the
/// `libraries` keys (`Name/Version`) of `obj/project.assets.json`. NuGet
/// stores packages under the resolved version, so `1.0`, `1.*` or
/// `[1.0,2.0)` in the project would not name an installed folder. Without a
/// restore the declared versions are kept.
fn resolve_versions_from_assets(project: &Path, deps: &mut [Dependency]) {
    let assets_path = project.with_file_name("obj").join("project.assets.json");
    let Ok(content) = std::fs::read_to_string(&assets_path) else {
        return;
    };
    let assets: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("{}: {e}", assets_path.display());
            return;
        }
    };
    let Some(libraries) = assets.get("libraries").and_then(|l| l.as_object()) else {
        return;
    };

    for dep in deps.iter_mut() {
        let restored = libraries.iter().find_map(|(key, info)| {
            let (name, version) = key.split_once('/')?;
            let is_package = info.get("type").and_then(|t| t.as_str()) == Some("package");
            (is_package && name.eq_ignore_ascii_case(&dep.name)).then(|| version.to_string())
        });
        match restored {
            Some(version) if version != dep.version => {
                log::debug!("{}: {} resolved to {version}", dep.name, dep.version);
                dep.version = version;
            }
            Some(_) => {}
            None => log::debug!("{}: not in {}", dep.name, assets_path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_parse_csproj() {
        let xml = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Newtonsoft.Json" Version="13.0.1" />
    <PackageReference Include="Serilog">
      <Version>2.12.0</Version>
    </PackageReference>
  </ItemGroup>
</Project>"#;
        let mut f = NamedTempFile::with_suffix(".csproj").unwrap();
        write!(f, "{}", xml).unwrap();
        let deps = parse_project_file(f.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "Newtonsoft.Json");
        assert_eq!(deps[0].version, "13.0.1");
        assert_eq!(deps[1].name, "Serilog");
        assert_eq!(deps[1].version, "2.12.0");
        assert_eq!(deps[1].ecosystem, Ecosystem::NuGet);
    }

    #[test]
    fn test_parse_packages_config() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package id="Newtonsoft.Json" version="13.0.1" targetFramework="net452" />
  <package id="NUnit" version="3.13.3" targetFramework="net452" />
</packages>"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", xml).unwrap();
        let deps = parse_packages_config(f.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "Newtonsoft.Json");
        assert_eq!(deps[0].version, "13.0.1");
    }

    #[test]
    fn test_solution_aggregates_projects() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("src").join("App");
        let lib = dir.path().join("src").join("Lib");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(
            app.join("App.csproj"),
            r#"<Project><ItemGroup>
                <PackageReference Include="Serilog" Version="2.12.0" />
                <PackageReference Include="Newtonsoft.Json" Version="13.0.1" />
            </ItemGroup></Project>"#,
        )
        .unwrap();
        std::fs::write(
            lib.join("Lib.csproj"),
            r#"<Project><ItemGroup>
                <PackageReference Include="newtonsoft.json" Version="13.0.1" />
                <PackageReference Include="Dapper" Version="2.1.0" />
            </ItemGroup></Project>"#,
        )
        .unwrap();

        let sln = dir.path().join("All.sln");
        std::fs::write(
            &sln,
            r#"Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App", "src\App\App.csproj", "{11111111-1111-1111-1111-111111111111}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Solution Items", "Solution Items", "{22222222-2222-2222-2222-222222222222}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Lib", "src\Lib\Lib.csproj", "{33333333-3333-3333-3333-333333333333}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Gone", "src\Gone\Gone.csproj", "{44444444-4444-4444-4444-444444444444}"
EndProject
"#,
        )
        .unwrap();

        let deps = DotNetAnalyzer::new().analyze(&sln).unwrap();
        let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Serilog", "Newtonsoft.Json", "Dapper"]);
    }

    #[test]
    fn test_versions_filled_from_assets() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("App.csproj");
        std::fs::write(
            &project,
            r#"<Project><ItemGroup><PackageReference Include="Serilog" /></ItemGroup></Project>"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("obj")).unwrap();
        std::fs::write(
            dir.path().join("obj").join("project.assets.json"),
            r#"{"libraries": {
                "Serilog/3.1.1": {"type": "package"},
                "Other/1.0.0": {"type": "project"}
            }}"#,
        )
        .unwrap();

        let deps = DotNetAnalyzer::new().analyze(&project).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].version, "3.1.1");
    }

    #[test]
    fn test_declared_versions_replaced_by_restored_ones() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("App.csproj");
        std::fs::write(
            &project,
            r#"<Project><ItemGroup>
                <PackageReference Include="Foo" Version="1.0" />
                <PackageReference Include="Bar" Version="2.*" />
                <PackageReference Include="Baz" Version="[3.0,4.0)" />
                <PackageReference Include="Unrestored" Version="5.0.0" />
            </ItemGroup></Project>"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("obj")).unwrap();
        std::fs::write(
            dir.path().join("obj").join("project.assets.json"),
            r#"{"libraries": {
                "Foo/1.0.0": {"type": "package"},
                "bar/2.4.1": {"type": "package"},
                "Baz/3.2.0": {"type": "package"}
            }}"#,
        )
        .unwrap();

        let deps = DotNetAnalyzer::new().analyze(&project).unwrap();
        let pairs: Vec<_> = deps.iter().map(|d| (d.name.as_str(), d.version.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("Foo", "1.0.0"), ("Bar", "2.4.1"), ("Baz", "3.2.0"), ("Unrestored", "5.0.0")]
        );
    }

    #[tokio::test]
    async fn test_restored_version_finds_installed_package() {
        use crate::registry::{nuget::NugetProvider, MetadataProvider};

        let dir = tempdir().unwrap();
        let project = dir.path().join("App.csproj");
        std::fs::write(
            &project,
            r#"<Project><ItemGroup><PackageReference Include="Foo" Version="1.0" /></ItemGroup></Project>"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("obj")).unwrap();
        std::fs::write(
            dir.path().join("obj").join("project.assets.json"),
            r#"{"libraries": {"Foo/1.0.0": {"type": "package"}}}"#,
        )
        .unwrap();

        let packages = dir.path().join("pkgs");
        let installed = packages.join("foo").join("1.0.0");
        std::fs::create_dir_all(&installed).unwrap();
        std::fs::write(
            installed.join("foo.nuspec"),
            "<package><metadata><id>Foo</id><version>1.0.0</version></metadata></package>",
        )
        .unwrap();

        let deps = DotNetAnalyzer::new().analyze(&project).unwrap();
        let metadata = NugetProvider::new(packages)
            .fetch(&deps[0].name, &deps[0].version)
            .await
            .unwrap();
        assert_eq!(metadata.version, "1.0.0");
        assert_eq!(metadata.package_dir, Some(installed));
    }

    #[test]
    fn test_missing_project() {
        let dir = tempdir().unwrap();
        let err = DotNetAnalyzer::new()
            .analyze(&dir.path().join("App.csproj"))
            .unwrap_err();
        assert!(matches!(err, NoticeError::ManifestNotFound { .. }));

        let err = DotNetAnalyzer::new()
            .analyze(&dir.path().join("All.sln"))
            .unwrap_err();
        assert!(matches!(err, NoticeError::ManifestNotFound { .. }));
    }
}
