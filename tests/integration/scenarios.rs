//! Page rendering scenarios: where content lands, nesting, front matter, and
//! whitespace handling.

use anyhow::Result;
use nestplate::test_utils::TestSite;
use std::path::Path;

const AWESOME: &str = "<div class=\"awesome\">\n  {{ template.content }}\n</div>\n";
const BETTER: &str = "<div class=\"better\">\n  {{ template.content }}\n</div>\n";

async fn render(site: &TestSite, page: &str, text: &str) -> Result<String> {
    site.add_page(page, text)?;
    let opened = site.open().await?;
    opened.render_page(Path::new(page))
}

#[tokio::test]
async fn test_content_is_placed_into_template() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("awesome.html", AWESOME)?;

    let output = render(&site, "index.html", "{% template awesome.html %}\n  I am content!\n{% endtemplate %}\n").await?;
    assert_eq!(output, "<div class=\"awesome\"> <p>I am content!</p> </div>\n");
    Ok(())
}

#[tokio::test]
async fn test_text_around_blocks_is_untouched() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("awesome.html", AWESOME)?;

    let output = render(
        &site,
        "index.html",
        "Content before\n\n{% template awesome.html %}\n  I am content!\n{% endtemplate %}\n\n  Content after\n",
    )
    .await?;
    assert_eq!(
        output,
        "Content before\n\n<div class=\"awesome\"> <p>I am content!</p> </div>\n\n  Content after\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_nested_templates() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("awesome.html", AWESOME)?;
    site.add_template("better.html", BETTER)?;

    let page = "{% template awesome.html %}\n  {% template better.html %}\n    Content\n  {% endtemplate %}\n{% endtemplate %}\n";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(
        output,
        "<div class=\"awesome\"> <div class=\"better\"> <p>Content</p> </div> </div>\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_front_matter_in_block_content() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template(
        "post.html",
        "<h1>{{ template.title }}</h1>\n<div class=\"{{ template.kind }}\">{{ template.content }}</div>",
    )?;

    let page = "{% template post.html %}\n  ---\n  title: Hello\n  kind: note\n  ---\n  Body text\n{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<h1>Hello</h1> <div class=\"note\"><p>Body text</p> </div>");
    Ok(())
}

#[tokio::test]
async fn test_template_front_matter_provides_defaults() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template(
        "milk.html",
        "---\nclass: milk\ntitle: Milk\n---\n<h1>{{ template.title }}</h1>\n<div class=\"{{ template.class }}\"></div>\n",
    )?;

    let output = render(&site, "default.html", "{% template milk.html %}{% endtemplate %}").await?;
    assert_eq!(output, "<h1>Milk</h1> <div class=\"milk\"></div>");

    let output = render(&site, "override.html", "{% template milk.html title: 'Chocolate milk' %}{% endtemplate %}").await?;
    assert_eq!(output, "<h1>Chocolate milk</h1> <div class=\"milk\"></div>");
    Ok(())
}

#[tokio::test]
async fn test_parse_html_keeps_content_raw() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("awesome.html", AWESOME)?;

    let page = "{% template awesome.html parse: \"html\" %}\n  # Heading\n  Content\n{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<div class=\"awesome\"> # Heading Content </div>");
    Ok(())
}

#[tokio::test]
async fn test_indentation_amount_does_not_matter() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("outer.html", "<div class=\"outer\">\n  {{ template.content }}\n</div>")?;
    site.add_template("indentation.html", "<div class=\"indentation\">\n  {{ template.content }}\n</div>")?;

    let page = "\
<div>
  <div>
    <div>
      {% template outer.html %}
        {% template indentation.html %}
          # Heading

          Content
        {% endtemplate %}
      {% endtemplate %}
    </div>
  </div>
</div>
";
    let output = render(&site, "index.html", page).await?;
    let expected = "\
<div>
  <div>
    <div>
      <div class=\"outer\"> <div class=\"indentation\"> <h1>Heading</h1> <p>Content</p> </div> </div>
    </div>
  </div>
</div>
";
    assert_eq!(output, expected);
    Ok(())
}

#[tokio::test]
async fn test_sloppy_indentation_with_front_matter() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template(
        "outer.html",
        "<div class=\"outer\">\n  <div class=\"meta\">{{ template.meta }}</div>\n  {{ template.content }}\n</div>",
    )?;
    site.add_template("indentation.html", "<div class=\"indentation\">\n  {{ template.content }}\n</div>")?;

    let page = "\
<div>
            <div>
    <div>
      {% template outer.html %}
    ---
    meta: There
    ---
          {% template indentation.html %}
            # Heading
            Content
          {% endtemplate %}
      {% endtemplate %}
    </div></div>
</div>
";
    let output = render(&site, "index.html", page).await?;
    let expected = "\
<div>
            <div>
    <div>
      <div class=\"outer\"> <div class=\"meta\">There</div> <div class=\"indentation\"> <h1>Heading</h1> <p>Content</p> </div> </div>
    </div></div>
</div>
";
    assert_eq!(output, expected);
    Ok(())
}

const LIST: &str = "<h1>{{ template.title }}</h1>\n<ul>\n{% for item in template.items %}  <li>{{ item }}</li>\n{% endfor %}</ul>\n";

#[tokio::test]
async fn test_list_in_yaml() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("list.html", LIST)?;

    let page = "{% template list.html %}\n  ---\n  title: Title\n  items:\n    - Two\n    - Three\n  ---\n{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<h1>Title</h1> <ul> <li>Two</li> <li>Three</li> </ul>");
    Ok(())
}

#[tokio::test]
async fn test_nested_lists_in_yaml() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("list.html", LIST)?;
    site.add_template("wrapper.html", "<section>{{ template.content }}</section>")?;

    let page = "\
{% template wrapper.html %}
  {% template list.html %}
    ---
    title: Title
    items: [Super, Effective]
    ---
  {% endtemplate %}
  {% template list.html %}
    ---
    title: Title
    items:
      - Double
      - Trouble
    ---
  {% endtemplate %}
{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(
        output,
        "<section><h1>Title</h1> <ul> <li>Super</li> <li>Effective</li> </ul> \
         <h1>Title</h1> <ul> <li>Double</li> <li>Trouble</li> </ul> </section>"
    );
    Ok(())
}

#[tokio::test]
async fn test_site_value_as_attribute() -> Result<()> {
    let site = TestSite::new()?;
    site.write_config("[site]\ntagline = \"Yasssssssssss\"\n")?;
    site.add_template("data-prop.html", "<h1>{{ template.title }}</h1>")?;

    let page = "{% template data-prop.html title: site.tagline %}\n  Test content\n{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<h1>Yasssssssssss</h1>");
    Ok(())
}

#[tokio::test]
async fn test_page_data_is_visible_inside_templates() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("header.html", "<header>{{ page.title }}: {{ template.content }}</header>")?;

    let page = "---\ntitle: Inherited\n---\n{% template header.html parse: 'html' %}hello{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<header>Inherited: hello</header>");
    Ok(())
}

#[tokio::test]
async fn test_markdown_page_is_converted_after_rendering() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("awesome.html", AWESOME)?;

    let page = "---\ntitle: Home\n---\n# {{ page.title }}\n\n{% template awesome.html %}Hi{% endtemplate %}\n";
    let output = render(&site, "index.md", page).await?;
    assert!(output.contains("<h1>Home</h1>"), "got: {output}");
    assert!(output.contains("<div class=\"awesome\"> <p>Hi</p> </div>"), "got: {output}");
    Ok(())
}

#[tokio::test]
async fn test_block_repeated_by_page_loop() -> Result<()> {
    let site = TestSite::new()?;
    site.write_config(
        "[site]\nposts = [\n  { title = \"First\", summary = \"one\" },\n  { title = \"Second\", summary = \"two\" },\n]\n",
    )?;
    site.add_template("card.html", "<h2>{{ template.title }}</h2>{{ template.content }}")?;

    let page = "\
{% for post in site.posts %}\
{% template card.html title: post.title, parse: 'html' %}{{ post.summary }}{% endtemplate %}\
{% endfor %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<h2>First</h2>one<h2>Second</h2>two");
    Ok(())
}

#[tokio::test]
async fn test_block_skipped_by_page_condition() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template("banner.html", "<aside>{{ template.content }}</aside>")?;

    let page = "---\nfeatured: false\n---\n{% if page.featured %}{% template banner.html %}Hot{% endtemplate %}{% endif %}rest";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "rest");
    Ok(())
}

#[tokio::test]
async fn test_attribute_from_missing_page_field_renders() -> Result<()> {
    let site = TestSite::new()?;
    site.add_template(
        "header.html",
        "<h1>{{ template.title | default(value='Untitled') }}</h1>{{ template.content }}",
    )?;

    let page = "{% template header.html title: page.title, parse: 'html' %}hi{% endtemplate %}";
    let output = render(&site, "index.html", page).await?;
    assert_eq!(output, "<h1>Untitled</h1>hi");
    Ok(())
}
