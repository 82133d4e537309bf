//! Asset pipeline for the default theme's CSS and JavaScript.

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Generate the main CSS file.
    pub fn generate_css() -> String {
        DEFAULT_CSS.to_string()
    }

    /// Generate the main JavaScript file.
    pub fn generate_js() -> String {
        DEFAULT_JS.to_string()
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}

const DEFAULT_CSS: &str = r#"/* atomdocs default theme */

:root {
  --primary: #6437ff;
  --background: #ffffff;
  --foreground: #1c1b22;
  --muted: #f5f5f8;
  --muted-foreground: #5c5b66;
  --border: #e3e2ea;
  --code-background: #f7f7fa;
  --error: #b42318;
  --error-background: #fef3f2;
  --radius: 0.375rem;
  --sidebar-width: 280px;
  --toc-width: 220px;
  --content-max-width: 860px;
}

* {
  box-sizing: border-box;
  margin: 0;
  padding: 0;
}

body {
  font-family: system-ui, -apple-system, sans-serif;
  background: var(--background);
  color: var(--foreground);
  line-height: 1.6;
}

.layout {
  display: grid;
  grid-template-columns: var(--sidebar-width) 1fr;
  min-height: 100vh;
}

/* Sidebar */
.sidebar {
  background: var(--muted);
  border-right: 1px solid var(--border);
  padding: 1.5rem;
  position: sticky;
  top: 0;
  height: 100vh;
  overflow-y: auto;
}

.nav-header {
  margin-bottom: 1.5rem;
  position: relative;
}

.nav-logo {
  display: flex;
  align-items: center;
  gap: 0.5rem;
  font-weight: 700;
  font-size: 1.15rem;
  color: var(--foreground);
  text-decoration: none;
}

.nav-logo img {
  height: 1.75rem;
}

.version-select,
.search-input {
  display: block;
  width: 100%;
  margin-top: 0.75rem;
  padding: 0.4rem 0.6rem;
  border: 1px solid var(--border);
  border-radius: var(--radius);
  background: var(--background);
  font: inherit;
}

.search-results {
  list-style: none;
  position: absolute;
  left: 0;
  right: 0;
  z-index: 20;
  background: var(--background);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  max-height: 60vh;
  overflow-y: auto;
}

.search-results:empty {
  display: none;
}

.search-results a {
  display: block;
  padding: 0.5rem 0.75rem;
  color: var(--foreground);
  text-decoration: none;
}

.search-results a:hover {
  background: var(--muted);
}

.nav-list,
.nav-children {
  list-style: none;
}

.nav-children {
  margin-left: 0.75rem;
}

.nav-item a {
  display: block;
  padding: 0.35rem 0.75rem;
  color: var(--muted-foreground);
  text-decoration: none;
  border-radius: var(--radius);
}

.nav-item a:hover {
  color: var(--foreground);
}

.nav-item.active > a {
  background: var(--primary);
  color: #ffffff;
}

.nav-section-title {
  display: block;
  padding: 0.5rem 0.75rem 0.25rem;
  font-size: 0.8rem;
  font-weight: 600;
  text-transform: uppercase;
  letter-spacing: 0.04em;
  color: var(--foreground);
}

.nav-item a.external::after {
  content: " \2197";
}

/* Main content */
.main {
  display: grid;
  grid-template-columns: minmax(0, 1fr) var(--toc-width);
  gap: 2rem;
  padding: 2rem;
  max-width: calc(var(--content-max-width) + var(--toc-width) + 4rem);
}

.doc {
  min-width: 0;
}

.content h1 {
  font-size: 2.25rem;
  margin-bottom: 1.25rem;
}

.content h2 {
  font-size: 1.5rem;
  margin: 2rem 0 1rem;
  padding-bottom: 0.4rem;
  border-bottom: 1px solid var(--border);
}

.content h3 {
  font-size: 1.2rem;
  margin: 1.5rem 0 0.75rem;
}

.content p,
.content ul,
.content ol,
.content table {
  margin-bottom: 1rem;
}

.content ul,
.content ol {
  padding-left: 1.5rem;
}

.content a {
  color: var(--primary);
  text-underline-offset: 3px;
}

.content img {
  max-width: 100%;
}

.content table {
  border-collapse: collapse;
}

.content th,
.content td {
  border: 1px solid var(--border);
  padding: 0.35rem 0.75rem;
}

/* Code */
.content pre {
  background: var(--code-background);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 1rem;
  overflow-x: auto;
  font-family: ui-monospace, monospace;
  font-size: 0.85rem;
  margin-bottom: 1rem;
  position: relative;
}

.content code {
  font-family: ui-monospace, monospace;
  font-size: 0.875em;
  background: var(--muted);
  padding: 0.1rem 0.35rem;
  border-radius: 0.25rem;
}

.content pre code {
  background: none;
  padding: 0;
}

.copy-btn {
  position: absolute;
  top: 0.5rem;
  right: 0.5rem;
  padding: 0.2rem 0.6rem;
  font-size: 0.75rem;
  background: var(--background);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  cursor: pointer;
}

/* Example cells */
.cell {
  margin-bottom: 1.25rem;
}

.cell-output {
  margin: -0.5rem 0 1rem;
  border-left: 3px solid var(--primary);
  background: var(--background);
  white-space: pre-wrap;
}

.cell-output.cell-stderr {
  border-left-color: #b07d00;
}

.cell-output.cell-error {
  border-left-color: var(--error);
  background: var(--error-background);
}

.cell-figure {
  margin: 0 0 1rem;
  text-align: center;
}

.download {
  display: inline-block;
  margin-bottom: 1.5rem;
  font-size: 0.9rem;
}

/* API reference */
.api-item {
  margin: 1.5rem 0 2rem;
}

.api-signature {
  font-family: ui-monospace, monospace;
  font-size: 0.9rem;
  background: var(--muted);
  border-left: 3px solid var(--primary);
  padding: 0.5rem 0.75rem;
  margin-bottom: 0.75rem;
  overflow-x: auto;
}

.api-kind {
  color: var(--muted-foreground);
  font-style: italic;
}

.api-members {
  margin-left: 1.5rem;
}

/* Table of contents */
.toc {
  position: sticky;
  top: 2rem;
  align-self: start;
}

.toc h2 {
  font-size: 0.75rem;
  font-weight: 600;
  text-transform: uppercase;
  letter-spacing: 0.05em;
  color: var(--muted-foreground);
  margin-bottom: 0.75rem;
}

.toc ul {
  list-style: none;
}

.toc a {
  font-size: 0.85rem;
  color: var(--muted-foreground);
  text-decoration: none;
}

.toc a:hover {
  color: var(--foreground);
}

.toc-level-3 {
  padding-left: 1rem;
}

.toc-level-4 {
  padding-left: 2rem;
}

.footer {
  display: flex;
  gap: 1.5rem;
  justify-content: center;
  padding: 1.5rem;
  border-top: 1px solid var(--border);
  font-size: 0.85rem;
  color: var(--muted-foreground);
}

.footer a {
  color: inherit;
}

/* Responsive */
.menu-btn {
  display: none;
  position: fixed;
  top: 1rem;
  left: 1rem;
  z-index: 100;
  padding: 0.5rem;
  background: var(--primary);
  color: #ffffff;
  border: none;
  border-radius: var(--radius);
  cursor: pointer;
}

@media (max-width: 1024px) {
  .layout {
    grid-template-columns: 1fr;
  }

  .sidebar {
    position: fixed;
    left: -100%;
    z-index: 50;
    transition: left 0.3s;
    width: var(--sidebar-width);
  }

  .sidebar.open {
    left: 0;
  }

  .main {
    grid-template-columns: 1fr;
    padding-top: 4rem;
  }

  .toc {
    display: none;
  }

  .menu-btn {
    display: block;
  }
}
"#;

const DEFAULT_JS: &str = r#"// atomdocs runtime
(function() {
  'use strict';

  const base = document.body.getAttribute('data-base') || './';

  // Mobile menu toggle
  const menuBtn = document.querySelector('.menu-btn');
  const sidebar = document.querySelector('.sidebar');

  if (menuBtn && sidebar) {
    menuBtn.addEventListener('click', () => {
      sidebar.classList.toggle('open');
    });
  }

  // Copy button for code blocks
  document.querySelectorAll('.content pre:not(.cell-output)').forEach(pre => {
    if (pre.querySelector('.copy-btn')) return;

    const btn = document.createElement('button');
    btn.className = 'copy-btn';
    btn.textContent = 'Copy';
    btn.setAttribute('type', 'button');

    btn.addEventListener('click', async () => {
      const code = pre.querySelector('code');
      const text = code ? code.textContent : pre.textContent;

      try {
        await navigator.clipboard.writeText(text || '');
        btn.textContent = 'Copied!';
      } catch (err) {
        btn.textContent = 'Error';
      }
      setTimeout(() => { btn.textContent = 'Copy'; }, 2000);
    });

    pre.appendChild(btn);
  });

  // Search
  const input = document.querySelector('.search-input');
  const results = document.querySelector('.search-results');
  let index = null;

  if (input && results) {
    input.addEventListener('input', async () => {
      const query = input.value.trim().toLowerCase();
      results.innerHTML = '';
      if (query.length < 2) return;

      if (index === null) {
        try {
          const response = await fetch(base + 'search-index.json');
          index = await response.json();
        } catch (err) {
          index = [];
        }
      }

      index
        .filter(entry =>
          entry.title.toLowerCase().includes(query) ||
          (entry.content || '').toLowerCase().includes(query))
        .slice(0, 10)
        .forEach(entry => {
          const li = document.createElement('li');
          const a = document.createElement('a');
          a.href = base + entry.url;
          a.textContent = entry.title;
          li.appendChild(a);
          results.appendChild(li);
        });
    });
  }

  // Version selector
  const select = document.querySelector('.version-select');

  if (select) {
    const current = select.getAttribute('data-current');
    fetch(base + '../versions.json')
      .then(response => response.json())
      .then(versions => {
        select.innerHTML = '';
        versions.forEach(v => {
          const option = document.createElement('option');
          option.value = v.version;
          option.textContent = v.aliases.length
            ? v.title + ' (' + v.aliases.join(', ') + ')'
            : v.title;
          option.selected = v.version === current;
          select.appendChild(option);
        });
      })
      .catch(() => {});

    select.addEventListener('change', () => {
      window.location.href = base + '../' + select.value + '/';
    });
  }
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_css() {
        let css = AssetPipeline::generate_css();
        assert!(css.contains(":root"));
        assert!(css.contains("--primary"));
        assert!(css.contains(".cell-output"));
    }

    #[test]
    fn generates_js() {
        let js = AssetPipeline::generate_js();
        assert!(js.contains("search-index.json"));
        assert!(js.contains("versions.json"));
        assert!(js.contains("clipboard"));
    }

    #[test]
    fn minifies_css() {
        let css = r#"
.cell-output {
    border-left: 3px solid blue;
    padding: 10px;
}
        "#;

        let minified = AssetPipeline::minify_css(css).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".cell-output"));
    }

    #[test]
    fn default_theme_survives_minification() {
        let minified = AssetPipeline::minify_css(&AssetPipeline::generate_css()).unwrap();

        assert!(minified.contains(".nav-section-title"));
    }
}
