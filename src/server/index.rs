//! HTML index pages.
//!
//! Both pages are handlebars templates, so every interpolated value is
//! HTML-escaped. Switch links go through the `switch_href` helper, which
//! joins its parameters with `:` and URL-encodes the endpoint.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde::Serialize;
use serde_json::Value;

use crate::backend::IndexView;
use crate::error::{Result, SwitchError};

const LIST: &str = "list";
const RELAYS: &str = "relays";

const LIST_TEMPLATE: &str = "Current server: {{current}}
<br>
Servers ({{len servers}}):
<br>
<ul>
{{#each servers}}<li><a href=\"{{switch_href this}}\">{{this}}</a></li>
{{/each}}</ul>
";

const LOCATION_PARTIAL: &str =
    "{{country}}, {{city}}, {{#if owned}}owned{{else}}rented{{/if}}";

const RELAYS_TEMPLATE: &str = "{{#if last_error}}<p>Relay list may be stale: {{last_error}}</p>
{{/if}}Current server: {{current}}
{{#if chain.[1]}}<ul>
  <li>entry: {{#with chain.[0]}}{{> location}}{{/with}}</li>
  <li>exit: {{#with chain.[1]}}{{> location}}{{/with}}</li>
</ul>
{{else}}{{#if chain.[0]}}<ul>
  <li>{{#with chain.[0]}}{{> location}}{{/with}}</li>
</ul>
{{/if}}{{/if}}<br>
Servers ({{len relays}}):
<br>
<table>
  <thead>
    <tr>
      <th>Country</th>
      <th>City</th>
      <th>Owned</th>
      <th>Switch</th>
    </tr>
  </thead>
  <tbody>
{{#each relays}}  <tr>
    <td>{{country}}</td>
    <td>{{city}}</td>
    <td>{{#if owned}}owned{{else}}rented{{/if}}</td>
    <td><a href=\"{{switch_href hostname port}}\">switch</a></td>
  </tr>
{{/each}}  </tbody>
</table>
<br>
";

#[derive(Serialize)]
struct ListPage<'a> {
    current: &'a str,
    servers: Vec<&'a str>,
}

/// Registered index templates.
pub struct IndexTemplates {
    handlebars: Handlebars<'static>,
}

impl IndexTemplates {
    /// Compiles the index templates.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Template`] if a template does not compile.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_helper("switch_href", Box::new(switch_href_helper));

        handlebars
            .register_partial("location", LOCATION_PARTIAL)
            .map_err(|e| SwitchError::Template(e.to_string()))?;
        handlebars
            .register_template_string(LIST, LIST_TEMPLATE)
            .map_err(|e| SwitchError::Template(e.to_string()))?;
        handlebars
            .register_template_string(RELAYS, RELAYS_TEMPLATE)
            .map_err(|e| SwitchError::Template(e.to_string()))?;

        Ok(Self { handlebars })
    }

    /// Current server and a sorted list of switch links.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Template`] if rendering fails.
    pub fn render_list(&self, current: &str, servers: &[String]) -> Result<String> {
        let mut servers: Vec<&str> = servers.iter().map(String::as_str).collect();
        servers.sort_unstable();
        self.render(LIST, &ListPage { current, servers })
    }

    /// Mullvad page: current chain and the relay table.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Template`] if rendering fails.
    pub fn render_relays(&self, view: &IndexView) -> Result<String> {
        self.render(RELAYS, view)
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.handlebars
            .render(name, data)
            .map_err(|e| SwitchError::Template(e.to_string()))
    }
}

/// `switch?server=<params joined by ':', URL-encoded>`
fn switch_href_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let endpoint = h
        .params()
        .iter()
        .map(|param| match param.value() {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(":");
    out.write("switch?server=")?;
    out.write(&urlencoding::encode(&endpoint))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::relay;

    fn templates() -> IndexTemplates {
        IndexTemplates::new().unwrap()
    }

    #[test]
    fn test_render_list_sorts_and_links() {
        let html = templates()
            .render_list("b:2", &["b:2".to_string(), "a:1".to_string()])
            .unwrap();
        assert!(html.starts_with("Current server: b:2\n"));
        assert!(html.contains("Servers (2):"));
        let a = html.find(r#"<a href="switch?server=a%3A1">a:1</a>"#).unwrap();
        let b = html.find(r#"<a href="switch?server=b%3A2">b:2</a>"#).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_render_list_escapes() {
        let html = templates()
            .render_list("<script>", &["x\"onclick:1".to_string()])
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("switch?server=x%22onclick%3A1"));
        assert!(!html.contains("x\"onclick"));
    }

    #[test]
    fn test_render_relays_multi_hop() {
        let mut exit = relay("de-fra-wg-101", 3101);
        exit.country = "Germany".to_string();
        exit.city = "Frankfurt".to_string();
        exit.owned = false;
        let view = IndexView {
            current: "se-got-wg-001.relays.mullvad.net:3101".to_string(),
            chain: vec![relay("se-got-wg-001", 3001), exit.clone()],
            relays: vec![exit, relay("se-got-wg-001", 3001)],
            last_error: None,
        };
        let html = templates().render_relays(&view).unwrap();
        assert!(html.contains("<li>entry: Sweden, Gothenburg, owned</li>"));
        assert!(html.contains("<li>exit: Germany, Frankfurt, rented</li>"));
        assert!(html.contains("Servers (2):"));
        assert!(html.contains("<td>rented</td>"));
        assert!(html.contains(
            r#"<a href="switch?server=de-fra-wg-101.relays.mullvad.net%3A51820">switch</a>"#
        ));
        assert!(!html.contains("stale"));
    }

    #[test]
    fn test_render_relays_single_hop() {
        let view = IndexView {
            current: "se-got-wg-001.relays.mullvad.net:51820".to_string(),
            chain: vec![relay("se-got-wg-001", 3001)],
            relays: vec![relay("se-got-wg-001", 3001)],
            last_error: None,
        };
        let html = templates().render_relays(&view).unwrap();
        assert!(html.contains("<ul>\n  <li>Sweden, Gothenburg, owned</li>\n</ul>"));
        assert!(!html.contains("entry:"));
    }

    #[test]
    fn test_render_relays_reports_stale_catalog() {
        let view = IndexView {
            current: "x:1".to_string(),
            last_error: Some("empty APIv2 response <timeout>".to_string()),
            ..IndexView::default()
        };
        let html = templates().render_relays(&view).unwrap();
        assert!(html.starts_with(
            "<p>Relay list may be stale: empty APIv2 response &lt;timeout&gt;</p>"
        ));
        assert!(!html.contains("<ul>"));
        assert!(html.contains("Servers (0):"));
    }
}
