use panelwire::{BehaviorConfig, Harness};

const OUTPUT_TYPE_PANEL: &str = r#"
<div id="outputTypeMenu">
  <span cookieName="RationalNumberOutputType" cookieValue="COMPONENTS">Components</span>
  <span cookieName="RationalNumberOutputType" cookieValue="EXACT">Exact</span>
  <span cookieName="RationalNumberOutputType" cookieValue="TRUNCATED">Truncated</span>
</div>
<div id="scaleMenu">
  <span cookieName="Scale" cookieValue="2">2</span>
  <span cookieName="Scale" cookieValue="10">10</span>
</div>
"#;

#[test]
fn without_a_cookie_nothing_is_marked() -> panelwire::Result<()> {
    let mut harness = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    harness.highlight_option("RationalNumberOutputType")?;
    for value in ["COMPONENTS", "EXACT", "TRUNCATED"] {
        harness.assert_class(&format!("[cookieValue='{value}']"), "select", false)?;
    }
    assert_eq!(harness.marked_option("RationalNumberOutputType")?, None);
    Ok(())
}

#[test]
fn select_option_marks_exactly_the_matching_element() -> panelwire::Result<()> {
    let mut harness = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    harness.select_option("RationalNumberOutputType", "EXACT")?;

    harness.assert_class("[cookieValue='EXACT']", "select", true)?;
    harness.assert_class("[cookieValue='COMPONENTS']", "select", false)?;
    harness.assert_class("[cookieValue='TRUNCATED']", "select", false)?;
    assert_eq!(harness.cookie("RationalNumberOutputType"), "EXACT");
    Ok(())
}

#[test]
fn reselection_moves_the_marker() -> panelwire::Result<()> {
    let mut harness = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    harness.select_option("RationalNumberOutputType", "EXACT")?;
    harness.select_option("RationalNumberOutputType", "TRUNCATED")?;

    harness.assert_class("[cookieValue='EXACT']", "select", false)?;
    harness.assert_class("[cookieValue='TRUNCATED']", "select", true)?;
    assert_eq!(
        harness.marked_option("RationalNumberOutputType")?,
        Some("TRUNCATED".to_string())
    );
    Ok(())
}

#[test]
fn highlight_reads_a_preexisting_cookie() -> panelwire::Result<()> {
    let mut harness = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    harness.set_cookie("Scale", "10");
    harness.highlight_option("Scale")?;
    harness.assert_class("[cookieName='Scale'][cookieValue='10']", "select", true)?;
    harness.assert_class("[cookieName='Scale'][cookieValue='2']", "select", false)?;
    Ok(())
}

#[test]
fn a_cookie_value_with_no_element_leaves_all_unmarked() -> panelwire::Result<()> {
    let mut harness = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    harness.set_cookie("Scale", "99");
    harness.highlight_option("Scale")?;
    harness.assert_class("[cookieName='Scale'][cookieValue='2']", "select", false)?;
    harness.assert_class("[cookieName='Scale'][cookieValue='10']", "select", false)?;
    assert_eq!(harness.marked_option("Scale")?, None);
    Ok(())
}

#[test]
fn dimensions_highlight_independently() -> panelwire::Result<()> {
    let mut harness = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    harness.set_cookie("RationalNumberOutputType", "COMPONENTS");
    harness.set_cookie("Scale", "2");
    harness.highlight_options(&["RationalNumberOutputType", "Scale"])?;

    harness.assert_class("[cookieValue='COMPONENTS']", "select", true)?;
    harness.assert_class("[cookieName='Scale'][cookieValue='2']", "select", true)?;
    Ok(())
}

#[test]
fn highlight_order_does_not_change_the_end_state() -> panelwire::Result<()> {
    let mut forward = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    let mut reverse = Harness::from_html(OUTPUT_TYPE_PANEL)?;
    for harness in [&mut forward, &mut reverse] {
        harness.set_cookie("RationalNumberOutputType", "EXACT");
        harness.set_cookie("Scale", "10");
    }
    forward.highlight_options(&["RationalNumberOutputType", "Scale"])?;
    reverse.highlight_options(&["Scale", "RationalNumberOutputType"])?;

    assert_eq!(
        forward.marked_option("RationalNumberOutputType")?,
        reverse.marked_option("RationalNumberOutputType")?
    );
    assert_eq!(forward.marked_option("Scale")?, reverse.marked_option("Scale")?);
    Ok(())
}

#[test]
fn duplicate_pairs_mark_only_the_first_in_document_order() -> panelwire::Result<()> {
    let html = r#"
    <span id="first" cookieName="Scale" cookieValue="2">2</span>
    <span id="second" cookieName="Scale" cookieValue="2">also 2</span>
    "#;
    let mut harness = Harness::from_html(html)?;
    harness.select_option("Scale", "2")?;
    harness.assert_class("#first", "select", true)?;
    harness.assert_class("#second", "select", false)?;
    Ok(())
}

#[test]
fn stale_marker_classes_are_cleared_before_marking() -> panelwire::Result<()> {
    // Server-rendered markup may arrive with a marker already applied.
    let html = r#"
    <span cookieName="Scale" cookieValue="2" class="select">2</span>
    <span cookieName="Scale" cookieValue="10">10</span>
    "#;
    let mut harness = Harness::from_html(html)?;
    harness.select_option("Scale", "10")?;
    harness.assert_class("[cookieValue='2']", "select", false)?;
    harness.assert_class("[cookieValue='10']", "select", true)?;
    Ok(())
}

#[test]
fn marker_class_is_configuration() -> panelwire::Result<()> {
    let config = BehaviorConfig {
        marker_class: "asteriskMarkAfter".into(),
        ..BehaviorConfig::default()
    };
    let mut harness = Harness::from_html_with_config(OUTPUT_TYPE_PANEL, config)?;
    harness.select_option("RationalNumberOutputType", "EXACT")?;

    harness.assert_class("[cookieValue='EXACT']", "asteriskMarkAfter", true)?;
    harness.assert_class("[cookieValue='EXACT']", "select", false)?;
    Ok(())
}

#[test]
fn unrelated_classes_survive_highlighting() -> panelwire::Result<()> {
    let html = r#"
    <span cookieName="Scale" cookieValue="2" class="menu-item">2</span>
    <span cookieName="Scale" cookieValue="10" class="menu-item select">10</span>
    "#;
    let mut harness = Harness::from_html(html)?;
    harness.select_option("Scale", "2")?;
    harness.assert_class("[cookieValue='2']", "menu-item", true)?;
    harness.assert_class("[cookieValue='2']", "select", true)?;
    harness.assert_class("[cookieValue='10']", "menu-item", true)?;
    harness.assert_class("[cookieValue='10']", "select", false)?;
    Ok(())
}
