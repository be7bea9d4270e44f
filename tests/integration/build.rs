//! Whole-site builds: output layout, failure isolation, configuration, and
//! dependency tracking.

use anyhow::Result;
use nestplate::test_utils::TestSite;
use std::path::{Path, PathBuf};

#[tokio::test]
async fn test_build_writes_every_page() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("box.html", "<div>{{ template.content }}</div>")?;
    site.add_page("index.html", "{% template box.html %}Home{% endtemplate %}")?;
    site.add_page("posts/first.md", "---\ntitle: First\n---\n# {{ page.title }}\n")?;
    site.add_page("notes.txt", "not a page")?;
    site.add_page("_drafts/hidden.md", "# Hidden")?;

    let opened = site.open().await?;
    let report = opened.build(&site.dest_path(), 2).await?;

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.written, vec![PathBuf::from("index.html"), PathBuf::from("posts/first.html")]);
    assert_eq!(site.read_output("index.html")?, "<div><p>Home</p> </div>");
    assert_eq!(site.read_output("posts/first.html")?, "<h1>First</h1>\n");
    assert!(!site.file_exists("_site/notes.txt"));
    assert!(!site.file_exists("_site/_drafts/hidden.html"));
    Ok(())
}

#[tokio::test]
async fn test_failing_page_does_not_stop_build() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("box.html", "<div>{{ template.content }}</div>")?;
    site.add_page("good.html", "{% template box.html parse: 'html' %}ok{% endtemplate %}")?;
    site.add_page("bad.html", "{% template boxes.html %}oops{% endtemplate %}")?;
    site.add_page("unclosed.html", "{% template box.html %}never closed")?;

    let opened = site.open().await?;
    let report = opened.build(&site.dest_path(), 3).await?;

    assert_eq!(report.total(), 3);
    assert_eq!(report.written, vec![PathBuf::from("good.html")]);
    let failed: Vec<&Path> = report.failures.iter().map(|(page, _)| page.as_path()).collect();
    assert_eq!(failed, vec![Path::new("bad.html"), Path::new("unclosed.html")]);

    let message = format!("{:#}", report.failures[0].1);
    assert!(message.contains("Template 'boxes.html' not found"), "got: {message}");

    assert_eq!(site.read_output("good.html")?, "<div>ok</div>");
    assert!(!site.file_exists("_site/bad.html"));
    Ok(())
}

#[tokio::test]
async fn test_missing_template_suggests_close_names() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("box.html", "")?;
    site.add_page("index.html", "{% template boxes.html %}{% endtemplate %}")?;

    let err = site.open().await?.render_page(Path::new("index.html")).unwrap_err();
    let render = err.downcast_ref::<nestplate::templating::RenderError>().expect("render error");
    let report = render.format_with_context();
    assert!(report.contains("Template Not Found"), "got: {report}");
    assert!(report.contains("box.html"), "got: {report}");
    assert!(report.contains("index.html"), "got: {report}");
    Ok(())
}

#[tokio::test]
async fn test_dependencies_registered_per_page() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("box.html", "<div>{{ template.content }}</div>")?;
    site.add_template("label.html", "<span>{{ template.content }}</span>")?;
    site.add_page(
        "index.html",
        "{% template box.html %}{% template label.html %}a{% endtemplate %}{% endtemplate %}{% template box.html %}b{% endtemplate %}",
    )?;
    site.add_page("about.html", "{% template label.html %}c{% endtemplate %}")?;
    site.add_page("plain.html", "no blocks")?;

    let opened = site.open().await?;
    let report = opened.build(&site.dest_path(), 2).await?;
    assert!(report.is_success(), "failures: {:?}", report.failures);

    let templates = site.source_path().join("_templates");
    let graph = opened.dependencies();
    assert_eq!(
        graph.dependencies_of(Path::new("index.html")),
        vec![templates.join("box.html"), templates.join("label.html")]
    );
    assert_eq!(graph.dependencies_of(Path::new("about.html")), vec![templates.join("label.html")]);
    assert!(graph.dependencies_of(Path::new("plain.html")).is_empty());
    assert_eq!(
        graph.consumers_of(&templates.join("label.html")),
        vec![PathBuf::from("about.html"), PathBuf::from("index.html")]
    );
    // every block registers, cached or not
    assert_eq!(graph.registrations(), 4);

    let tree = graph.to_tree_string();
    assert!(tree.contains("index.html\n├── "), "got: {tree}");
    Ok(())
}

#[tokio::test]
async fn test_config_changes_templates_dir_and_conversion() -> Result<()> {
    let site = TestSite::new()?;
    site.write_config(
        "[render]\ntemplates_dir = \"partials\"\nmarkdown = false\n\n[render.compress]\nenabled = false\n",
    )?;
    site.create_file("partials/box.html", "<div>\n  {{ template.content }}\n</div>")?;
    site.add_page("index.html", "{% template box.html %}\n  **raw**\n{% endtemplate %}")?;

    let output = site.open().await?.render_page(Path::new("index.html"))?;
    assert_eq!(output, "<div>\n  **raw**\n\n</div>");
    Ok(())
}

#[tokio::test]
async fn test_comment_placeholder_survives_when_comments_kept() -> Result<()> {
    let site = TestSite::new()?;
    site.write_config("[render]\nempty_content_placeholder = true\n\n[render.compress]\nremove_comments = false\n")?;
    site.add_template("empty.html", "<div>\n  {{ template.content }}\n</div>")?;
    site.add_page("index.html", "{% template empty.html %}\n{% endtemplate %}")?;

    let output = site.open().await?.render_page(Path::new("index.html"))?;
    assert_eq!(output, "<div> <!-- empty.html --> </div>");
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_an_error() -> Result<()> {
    let site = TestSite::new()?;
    site.write_config("[render]\nmarkdown = \"maybe\"\n")?;

    let err = match site.open().await {
        Ok(_) => panic!("expected invalid config to fail"),
        Err(err) => err,
    };
    assert!(format!("{err:#}").contains("Failed to parse site config"), "got: {err:#}");
    Ok(())
}
