//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use horizon_repeater::{
    DataTemplate, Element, ItemsRepeater, ItemsSourceView, RecyclingElementFactory, Rect, Size,
};

/// One item of a test source: a stable id and the height of its row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: u32,
    pub height: f32,
}

impl Row {
    pub fn new(id: u32, height: f32) -> Self {
        Self { id, height }
    }
}

pub fn rows(count: usize, height: f32) -> Vec<Row> {
    (0..count as u32).map(|id| Row::new(id, height)).collect()
}

/// A row element with a fixed size and the id of the row it shows.
#[derive(Debug, Default)]
pub struct RowElement {
    pub size: Size,
    pub id: Option<u32>,
    pub selected: bool,
    pub focused: bool,
}

impl Element for RowElement {
    fn measure(&mut self, available: Size) -> Size {
        let width = if available.width.is_finite() { available.width } else { self.size.width };
        Size::new(width, self.size.height)
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    fn is_selected(&self) -> bool {
        self.selected
    }

    fn clear_data_context(&mut self) {
        self.id = None;
    }

    fn focus(&mut self) -> bool {
        self.focused = true;
        true
    }
}

pub struct RowTemplate {
    pub width: f32,
}

impl DataTemplate<Row> for RowTemplate {
    fn build(&mut self) -> Box<dyn Element> {
        Box::new(RowElement::default())
    }

    fn bind(&mut self, element: &mut (dyn Element + 'static), data: &Row, _index: usize) {
        if let Some(row) = element.downcast_mut::<RowElement>() {
            row.size = Size::new(self.width, data.height);
            row.id = Some(data.id);
        }
    }
}

pub fn factory() -> RecyclingElementFactory<RowTemplate> {
    RecyclingElementFactory::new(RowTemplate { width: 100.0 })
}

/// A repeater over keyed rows with the visible window at the top.
pub fn keyed_repeater(count: usize, height: f32, window: Rect) -> ItemsRepeater<Row> {
    let mut repeater = ItemsRepeater::new(factory());
    let source = ItemsSourceView::with_key_mapping(rows(count, height), |row: &Row| row.id.to_string());
    repeater.set_items_source(Some(source)).unwrap();
    repeater.set_visible_window(window);
    repeater
}

pub fn layout_pass(repeater: &mut ItemsRepeater<Row>, width: f32) -> Size {
    let desired = repeater.measure(Size::new(width, f32::INFINITY)).unwrap();
    repeater.arrange(desired).unwrap();
    desired
}

pub fn row_id(repeater: &ItemsRepeater<Row>, index: usize) -> Option<u32> {
    let element = repeater.try_get_element(index)?;
    repeater.elements().downcast_ref::<RowElement>(element)?.id
}

/// Install a subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
