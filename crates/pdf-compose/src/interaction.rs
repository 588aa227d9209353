//! Pointer interaction: selection, dragging and cross-page teleport
//!
//! The controller is a small state machine (`Idle -> Dragging -> Idle`) that
//! turns pointer events into Document Model mutations. When a dragged element
//! reaches the left or right edge band of the canvas and an adjacent page
//! exists, it is moved onto that page. Switching the visible page is queued
//! as a [`FollowUp`] and only applied by [`InteractionController::run_deferred`],
//! after the mutation has been committed.

use crate::context::{DevicePoint, RenderContext};
use crate::document::{DocumentModel, ElementPatch};
use crate::options::ComposeOptions;
use crate::types::*;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging {
        /// Page the dragged element currently lives on
        page: usize,
        last: DevicePoint,
    },
}

/// Work queued by a mutation, applied once the mutation has landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    SwitchPage(usize),
}

/// Result of a pointer-move event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No drag in progress
    Ignored,
    /// The element moved within its page
    Moved,
    /// The element moved onto an adjacent page
    Teleported { from: usize, to: usize },
}

#[derive(Debug)]
pub struct InteractionController {
    current_page: usize,
    selected: Option<ElementId>,
    state: DragState,
    /// Cleared by a teleport; set again once the pointer is out of the edge band
    edge_armed: bool,
    deferred: VecDeque<FollowUp>,
    edge_threshold: f32,
    teleport_inset: f32,
}

impl InteractionController {
    pub fn new(options: &ComposeOptions) -> Self {
        Self {
            current_page: 0,
            selected: None,
            state: DragState::Idle,
            edge_armed: true,
            deferred: VecDeque::new(),
            edge_threshold: options.edge_threshold_pt,
            teleport_inset: options.teleport_inset_pt,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Follow-ups waiting for [`run_deferred`](Self::run_deferred)
    pub fn pending(&self) -> impl Iterator<Item = &FollowUp> {
        self.deferred.iter()
    }

    /// Show another page. Clears the selection and any drag in progress.
    pub fn set_current_page(&mut self, model: &DocumentModel, index: usize) -> Result<()> {
        if index >= model.page_count() {
            return Err(ComposeError::UnknownPage(index));
        }
        self.current_page = index;
        self.selected = None;
        self.state = DragState::Idle;
        Ok(())
    }

    pub fn select(&mut self, id: Option<ElementId>) {
        self.selected = id;
    }

    /// Re-validate against the model after pages or elements were removed
    pub fn sync(&mut self, model: &DocumentModel) {
        let last_page = model.page_count().saturating_sub(1);
        if self.current_page > last_page {
            self.current_page = last_page;
            self.state = DragState::Idle;
        }
        if let Some(id) = self.selected {
            if model.element(self.current_page, id).is_none() {
                self.selected = None;
                self.state = DragState::Idle;
            }
        }
    }

    /// Select the topmost element under the pointer and start dragging it.
    /// A miss clears the selection.
    pub fn pointer_down(
        &mut self,
        model: &DocumentModel,
        ctx: &RenderContext,
        point: DevicePoint,
    ) -> Option<ElementId> {
        let canvas = ctx.to_canvas(point);
        let snapshot = model.snapshot();
        let hit = snapshot
            .page(self.current_page)
            .and_then(|page| page.hit_test(canvas.x, canvas.y))
            .map(|element| element.id);

        self.selected = hit;
        self.state = match hit {
            Some(_) => DragState::Dragging {
                page: self.current_page,
                last: point,
            },
            None => DragState::Idle,
        };
        self.edge_armed = true;
        hit
    }

    /// Drag the selected element, teleporting it across an edge when an
    /// adjacent page exists
    pub fn pointer_move(
        &mut self,
        model: &mut DocumentModel,
        ctx: &RenderContext,
        point: DevicePoint,
    ) -> Result<MoveOutcome> {
        let (DragState::Dragging { page, last }, Some(id)) = (self.state, self.selected) else {
            return Ok(MoveOutcome::Ignored);
        };
        let Some(element) = model.element(page, id) else {
            // Removed underneath the gesture
            self.state = DragState::Idle;
            return Ok(MoveOutcome::Ignored);
        };

        let canvas = ctx.to_canvas(point);
        let dx = (point.x - last.x) * ctx.scale_x();
        let dy = (point.y - last.y) * ctx.scale_y();
        let (x, y) = (element.x, element.y);
        let (rendered_width, _) = element.rendered_size();

        let near_right = canvas.x > ctx.logical_width - self.edge_threshold;
        let near_left = canvas.x < self.edge_threshold;
        if !near_right && !near_left {
            self.edge_armed = true;
        }

        let target = if !self.edge_armed {
            None
        } else if near_right && page + 1 < model.page_count() {
            Some((page + 1, self.teleport_inset))
        } else if near_left && page > 0 {
            let sheet_width = model.sheet().width_pt;
            Some((page - 1, sheet_width - rendered_width - self.teleport_inset))
        } else {
            None
        };

        let outcome = match target {
            Some((to, new_x)) => {
                model.move_element(page, to, id, new_x, y + dy)?;
                self.edge_armed = false;
                self.deferred.push_back(FollowUp::SwitchPage(to));
                log::debug!("Teleported {} from page {} to page {}", id, page, to);
                MoveOutcome::Teleported { from: page, to }
            }
            None => {
                model.update_element(page, id, ElementPatch::position(x + dx, y + dy))?;
                MoveOutcome::Moved
            }
        };

        let page = match outcome {
            MoveOutcome::Teleported { to, .. } => to,
            _ => page,
        };
        self.state = DragState::Dragging { page, last: point };
        Ok(outcome)
    }

    /// End the gesture. The selection stays.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    /// Apply queued follow-ups and return the page now shown if it changed.
    /// The dragged element stays selected across a teleport.
    pub fn run_deferred(&mut self) -> Option<usize> {
        let mut switched = None;
        while let Some(follow_up) = self.deferred.pop_front() {
            match follow_up {
                FollowUp::SwitchPage(index) => {
                    self.current_page = index;
                    switched = Some(index);
                }
            }
        }
        switched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Placement, SourceImage};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn source() -> SourceImage {
        let img = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        SourceImage::decode("square.png", bytes).unwrap()
    }

    fn setup(pages: usize) -> (DocumentModel, InteractionController, RenderContext, ElementId) {
        let options = ComposeOptions::default();
        let mut model = DocumentModel::new(Orientation::Portrait, &options);
        for _ in 1..pages {
            model.add_page();
        }
        let placement = Placement {
            x: 200.0,
            y: 300.0,
            scale: 1.0,
        };
        let id = model.add_element(0, source(), Some(placement)).unwrap();
        let ctx = RenderContext::unscaled(model.sheet());
        (model, InteractionController::new(&options), ctx, id)
    }

    #[test]
    fn test_pointer_down_selects_and_misses_clear() {
        let (model, mut ctl, ctx, id) = setup(1);

        assert_eq!(ctl.pointer_down(&model, &ctx, DevicePoint::new(250.0, 350.0)), Some(id));
        assert!(ctl.is_dragging());

        ctl.pointer_up();
        assert_eq!(ctl.pointer_down(&model, &ctx, DevicePoint::new(10.0, 10.0)), None);
        assert_eq!(ctl.selected(), None);
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn test_drag_applies_scaled_delta() {
        let (mut model, mut ctl, _, id) = setup(1);
        let ctx = RenderContext::new(model.sheet(), 595.28 / 2.0, 841.89 / 2.0, 1.0);

        ctl.pointer_down(&model, &ctx, DevicePoint::new(125.0, 175.0));
        let outcome = ctl
            .pointer_move(&mut model, &ctx, DevicePoint::new(135.0, 170.0))
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Moved);
        let element = model.element(0, id).unwrap();
        assert!((element.x - 220.0).abs() < 1e-3);
        assert!((element.y - 290.0).abs() < 1e-3);
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let (mut model, mut ctl, ctx, _) = setup(1);
        let outcome = ctl
            .pointer_move(&mut model, &ctx, DevicePoint::new(1.0, 1.0))
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Ignored);
    }

    #[test]
    fn test_edge_trigger_rearms_after_leaving_band() {
        let (mut model, mut ctl, ctx, id) = setup(3);

        ctl.pointer_down(&model, &ctx, DevicePoint::new(250.0, 350.0));
        let first = ctl
            .pointer_move(&mut model, &ctx, DevicePoint::new(580.0, 350.0))
            .unwrap();
        assert_eq!(first, MoveOutcome::Teleported { from: 0, to: 1 });

        // Holding in the band does not chain onto page 2
        let held = ctl
            .pointer_move(&mut model, &ctx, DevicePoint::new(585.0, 350.0))
            .unwrap();
        assert_eq!(held, MoveOutcome::Moved);
        assert!(model.element(1, id).is_some());

        ctl.pointer_move(&mut model, &ctx, DevicePoint::new(300.0, 350.0))
            .unwrap();
        let second = ctl
            .pointer_move(&mut model, &ctx, DevicePoint::new(580.0, 350.0))
            .unwrap();
        assert_eq!(second, MoveOutcome::Teleported { from: 1, to: 2 });

        assert_eq!(ctl.run_deferred(), Some(2));
        assert_eq!(ctl.selected(), Some(id));
    }

    #[test]
    fn test_set_current_page_clears_selection() {
        let (model, mut ctl, ctx, _) = setup(2);
        ctl.pointer_down(&model, &ctx, DevicePoint::new(250.0, 350.0));

        ctl.set_current_page(&model, 1).unwrap();
        assert_eq!(ctl.selected(), None);
        assert!(ctl.set_current_page(&model, 2).is_err());
    }

    #[test]
    fn test_sync_drops_removed_selection() {
        let (mut model, mut ctl, ctx, id) = setup(1);
        ctl.pointer_down(&model, &ctx, DevicePoint::new(250.0, 350.0));
        model.remove_element(0, id).unwrap();

        ctl.sync(&model);
        assert_eq!(ctl.selected(), None);
        assert!(!ctl.is_dragging());
    }
}
