//! Tests for the `nestplate` binary.

use anyhow::Result;
use assert_cmd::Command;
use nestplate::test_utils::TestSite;
use predicates::prelude::*;

fn nestplate() -> Command {
    Command::cargo_bin("nestplate").unwrap()
}

fn sample_site() -> Result<TestSite> {
    let site = TestSite::new()?;
    site.add_template("box.html", "<div class=\"box\">{{ template.content }}</div>")?;
    site.add_page("index.html", "{% template box.html parse: 'html' %}Hello{% endtemplate %}")?;
    site.add_page("posts/post.md", "{% template box.html %}Post{% endtemplate %}")?;
    Ok(site)
}

#[test]
fn test_render_prints_page() -> Result<()> {
    let site = sample_site()?;

    nestplate()
        .args(["render", "index.html", "--source"])
        .arg(site.source_path())
        .assert()
        .success()
        .stdout("<div class=\"box\">Hello</div>\n");
    Ok(())
}

#[test]
fn test_render_accepts_path_inside_source() -> Result<()> {
    let site = sample_site()?;

    nestplate()
        .arg("render")
        .arg(site.source_path().join("index.html"))
        .arg("--source")
        .arg(site.source_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello"));
    Ok(())
}

#[test]
fn test_render_missing_template_fails() -> Result<()> {
    let site = sample_site()?;
    site.add_page("broken.html", "{% template boxx.html %}x{% endtemplate %}")?;

    nestplate()
        .args(["render", "broken.html", "--source"])
        .arg(site.source_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template Not Found"))
        .stderr(predicate::str::contains("box.html"));
    Ok(())
}

#[test]
fn test_build_writes_site() -> Result<()> {
    let site = sample_site()?;

    nestplate()
        .args(["build", "--jobs", "2", "--source"])
        .arg(site.source_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 2 page(s)"));

    assert_eq!(site.read_output("index.html")?, "<div class=\"box\">Hello</div>");
    assert!(site.read_output("posts/post.html")?.contains("<p>Post</p>"));
    Ok(())
}

#[test]
fn test_build_to_custom_dest_with_deps() -> Result<()> {
    let site = sample_site()?;
    let dest = site.temp_dir.path().join("public");

    nestplate()
        .args(["build", "--deps", "--source"])
        .arg(site.source_path())
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("index.html\n└── "))
        .stdout(predicate::str::contains("box.html"));

    assert!(dest.join("index.html").exists());
    assert!(dest.join("posts/post.html").exists());
    Ok(())
}

#[test]
fn test_build_reports_failed_pages() -> Result<()> {
    let site = sample_site()?;
    site.add_page("broken.html", "{% template box.html %}unclosed")?;

    nestplate()
        .args(["build", "--source"])
        .arg(site.source_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.html"))
        .stderr(predicate::str::contains("1 of 3 page(s) failed to render"));

    assert!(site.read_output("index.html").is_ok());
    Ok(())
}

#[test]
fn test_missing_source_directory() -> Result<()> {
    let site = TestSite::new()?;

    nestplate()
        .args(["build", "--source"])
        .arg(site.temp_dir.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source directory not found"));
    Ok(())
}

#[test]
fn test_verbose_and_quiet_conflict() {
    nestplate().args(["--verbose", "--quiet", "build"]).assert().failure();
}
