//! Property forwarding between nested blocks and isolation between blocks
//! and pages.

use anyhow::Result;
use nestplate::test_utils::TestSite;
use std::path::Path;

const HEADING: &str = "<h1>{{ template.title }}</h1>\n{{ template.content }}";

#[tokio::test]
async fn test_props_chain_through_four_levels() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("heading.html", HEADING)?;
    site.add_page(
        "index.html",
        "\
{% template heading.html title: 'One', props.next: 'Two' %}
  {% template heading.html title: props.next, props.next: 'Three' %}
    {% template heading.html title: props.next, props.next: 'Four' %}
      {% template heading.html title: props.next %}{% endtemplate %}
    {% endtemplate %}
  {% endtemplate %}
{% endtemplate %}
",
    )?;

    let output = site.open().await?.render_page(Path::new("index.html"))?;
    assert_eq!(output, "<h1>One</h1> <h1>Two</h1> <h1>Three</h1> <h1>Four</h1>\n");
    Ok(())
}

#[tokio::test]
async fn test_forwarded_prop_reaches_grandchild_by_reference() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("box.html", "<div>{{ template.content }}</div>")?;
    site.add_template("label.html", "<span>{{ template.text }}</span>")?;
    site.add_page(
        "index.html",
        "\
{% template box.html parse: 'html', props.color: 'teal' %}\
{% template box.html parse: 'html', props.color: props.color %}\
{% template label.html text: props.color %}{% endtemplate %}\
{% endtemplate %}\
{% endtemplate %}",
    )?;

    let output = site.open().await?.render_page(Path::new("index.html"))?;
    assert_eq!(output, "<div><div><span>teal</span></div></div>");
    Ok(())
}

#[tokio::test]
async fn test_props_do_not_leak_between_top_level_blocks() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("outer.html", "{{ template.content }}")?;
    site.add_template("inner.html", "[{{ template.title | default(value='none') }}]")?;
    site.add_page(
        "index.html",
        "\
{% template outer.html parse: 'html', props.title: 'first' %}{% template inner.html title: props.title %}{% endtemplate %}{% endtemplate %}\
{% template outer.html parse: 'html' %}{% template inner.html title: props.title %}{% endtemplate %}{% endtemplate %}",
    )?;

    let output = site.open().await?.render_page(Path::new("index.html"))?;
    assert_eq!(output, "[first][none]");
    Ok(())
}

#[tokio::test]
async fn test_props_do_not_leak_between_pages() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("outer.html", "{{ template.content }}")?;
    site.add_template("inner.html", "[{{ template.title | default(value='none') }}]")?;
    site.add_page(
        "a.html",
        "{% template outer.html parse: 'html', props.title: 'from a' %}{% template inner.html title: props.title %}{% endtemplate %}{% endtemplate %}",
    )?;
    site.add_page(
        "b.html",
        "{% template inner.html title: props.title %}{% endtemplate %}",
    )?;

    let opened = site.open().await?;
    let report = opened.build(&site.dest_path(), 4).await?;
    assert!(report.is_success(), "failures: {:?}", report.failures);

    assert_eq!(site.read_output("a.html")?, "[from a]");
    assert_eq!(site.read_output("b.html")?, "[none]");
    Ok(())
}

#[tokio::test]
async fn test_block_inside_template_file_sees_caller_bundle() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template(
        "card.html",
        "<article>{% template frame.html parse: 'html', props.accent: template.accent %}{{ template.content }}{% endtemplate %}</article>",
    )?;
    site.add_template("frame.html", "<div class=\"{{ template.accent }}\">{{ template.content }}</div>")?;
    site.add_page("index.html", "{% template card.html parse: 'html', accent: 'red' %}body{% endtemplate %}")?;

    let output = site.open().await?.render_page(Path::new("index.html"))?;
    assert_eq!(output, "<article><div class=\"red\">body</div></article>");
    Ok(())
}
