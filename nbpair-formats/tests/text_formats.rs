use nbpair_core::{Cell, Notebook};
use nbpair_formats::{reads, writes, FormatSpec};
use rstest::rstest;
use serde_json::json;

fn spec(s: &str) -> FormatSpec {
    s.parse().expect("valid format")
}

/// A notebook with the shapes of cells found in real projects.
fn analysis_notebook() -> Notebook {
    let mut params = Cell::code("alpha = 0.1\nbeta = 2");
    params.metadata.insert("tags".into(), json!(["parameters"]));

    let mut executed = Cell::code("import math\n\n\ndef area(r):\n    return math.pi * r ** 2");
    executed.execution_count = Some(3);
    executed.metadata.insert("ExecuteTime".into(), json!({"end_time": "2024-01-01"}));

    let mut nb = Notebook::new(vec![
        Cell::markdown("# Analysis\n\nThis notebook computes areas."),
        params,
        executed,
        Cell::markdown("## Results"),
        Cell::code("# show the result\narea(1)"),
        Cell::raw("raw output kept verbatim"),
    ]);
    nb.metadata.insert(
        "kernelspec".into(),
        json!({"display_name": "Python 3", "language": "python", "name": "python3"}),
    );
    nb
}

#[rstest]
#[case("light", "py:light")]
#[case("percent", "py:percent")]
#[case("markdown", "md")]
#[case("suffixed percent", ".pct.py:percent")]
fn text_formats_keep_cells(#[case] label: &str, #[case] fmt: &str) {
    let nb = analysis_notebook();
    let text = writes(&nb, &spec(fmt)).unwrap_or_else(|e| panic!("{label}: {e}"));
    let back = reads(&text, &spec(fmt)).unwrap_or_else(|e| panic!("{label}: {e}"));

    assert!(back.same_content(&nb), "{label}:\n{text}");
    assert_eq!(back.metadata["kernelspec"], nb.metadata["kernelspec"], "{label}");
    assert_eq!(back.cells[1].metadata["tags"], json!(["parameters"]), "{label}");
    assert!(
        !back.cells[2].metadata.contains_key("ExecuteTime"),
        "{label}: volatile metadata must stay out of text"
    );
    assert!(!text.contains("ExecuteTime"), "{label}");
}

#[test]
fn hand_written_percent_script() {
    let text = "\
import numpy as np

# %% [markdown]
# # Heading
# Some *text*

# %% Plot
x = np.linspace(0, 1)


# %%
";
    let nb = reads(text, &spec("py:percent")).unwrap();
    let sources: Vec<&str> = nb.cells.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(
        sources,
        vec!["import numpy as np", "# Heading\nSome *text*", "x = np.linspace(0, 1)", ""]
    );
    assert_eq!(nb.cells[2].metadata["title"], json!("Plot"));
}

#[test]
fn hand_written_markdown_document() {
    let text = "\
---
jupyter:
  jupytext:
    formats: ipynb,md
---

Notebook was edited

```python
1 + 1
```
";
    let nb = reads(text, &spec("md")).unwrap();
    assert_eq!(nb.formats(), Some("ipynb,md"));
    assert_eq!(
        nb.cells,
        vec![Cell::markdown("Notebook was edited"), Cell::code("1 + 1")]
    );
}

#[test]
fn javascript_uses_slash_comments() {
    let mut nb = Notebook::new(vec![Cell::markdown("Intro"), Cell::code("let x = 1;")]);
    nb.metadata.insert(
        "kernelspec".into(),
        json!({"display_name": "JS", "language": "javascript", "name": "javascript"}),
    );
    let text = writes(&nb, &spec("auto:percent")).unwrap();
    assert!(text.contains("// %% [markdown]\n// Intro\n\n// %%\nlet x = 1;\n"));
    assert!(text.starts_with("// ---\n// jupyter:\n"));
}

/// Cells whose lines look like the cell markers of some text format.
fn marker_lookalike_notebook() -> Notebook {
    let mut nb = Notebook::new(vec![
        Cell::markdown("Options:\n+ fast\n+ slow"),
        Cell::code("x = 1"),
        Cell::code("x = 1\n# + add one\ny = x + 1"),
        Cell::markdown("Use\n%% matlab cells"),
        Cell::code("s = '''\n```\n'''"),
        Cell::code("# %% not a cell\nz = 3"),
    ]);
    nb.metadata.insert(
        "kernelspec".into(),
        json!({"display_name": "Python 3", "language": "python", "name": "python3"}),
    );
    nb
}

#[rstest]
#[case("light", "py:light")]
#[case("percent", "py:percent")]
#[case("markdown", "md")]
fn marker_lookalikes_stay_inside_their_cells(#[case] label: &str, #[case] fmt: &str) {
    let nb = marker_lookalike_notebook();
    let text = writes(&nb, &spec(fmt)).unwrap_or_else(|e| panic!("{label}: {e}"));
    let back = reads(&text, &spec(fmt)).unwrap_or_else(|e| panic!("{label}: {e}"));
    assert_eq!(back.cells, nb.cells, "{label}:\n{text}");
}
