//! Property/fuzz-style invariants for handle drags.
//!
//! Random containers (mixed `fr`, `px` and `%` panes with optional bounds,
//! separated by handles) receive random drag streams. After every step the
//! layout must still fill the container, respect every bound, and keep every
//! fraction non-negative.

use gridpane_layout::{Axis, Length, NodeId, ResizeEngine, Size, SizeSpec};
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
enum PaneDecl {
    Fraction(f64),
    /// A `px` or `%` pane. Bounds may use either unit and need not bracket
    /// the base size.
    Fixed {
        size: Size,
        min: Option<Length>,
        max: Option<Length>,
    },
}

impl PaneDecl {
    fn spec(&self) -> SizeSpec {
        let built = match *self {
            Self::Fraction(value) => SizeSpec::bounded(Size::Fr(value), None, None),
            Self::Fixed { size, min, max } => SizeSpec::bounded(size, min, max),
        };
        built.expect("generated declarations are valid")
    }
}

fn length_strategy() -> impl Strategy<Value = Length> {
    prop_oneof![
        (0u32..=150).prop_map(|px| Length::Px(f64::from(px))),
        (0u32..=20).prop_map(|points| Length::Percent(f64::from(points))),
    ]
}

fn fixed_size_strategy() -> impl Strategy<Value = Size> {
    prop_oneof![
        (10u32..=120).prop_map(|px| Size::Px(f64::from(px))),
        (2u32..=10).prop_map(|points| Size::Percent(f64::from(points))),
    ]
}

fn pane_strategy() -> impl Strategy<Value = PaneDecl> {
    prop_oneof![
        (1u32..=8).prop_map(|halves| PaneDecl::Fraction(f64::from(halves) * 0.5 + 0.5)),
        (
            fixed_size_strategy(),
            prop::option::of(length_strategy()),
            prop::option::of(length_strategy()),
        )
            .prop_map(|(size, min, max)| {
                // Same-unit bounds must not be inverted; mixed units may be.
                let (min, max) = match (min, max) {
                    (Some(lo), Some(hi)) if lo.unit() == hi.unit() && lo.value() > hi.value() => {
                        (Some(hi), Some(lo))
                    }
                    bounds => bounds,
                };
                PaneDecl::Fixed { size, min, max }
            }),
    ]
}

struct Fixture {
    engine: ResizeEngine,
    panes: Vec<NodeId>,
    handles: Vec<NodeId>,
}

fn build(container: f64, decls: &[PaneDecl], handle_px: f64) -> Fixture {
    let mut engine = ResizeEngine::new(Axis::Row).with_container_size(container);
    let mut panes = Vec::new();
    let mut handles = Vec::new();
    for (index, decl) in decls.iter().enumerate() {
        if index > 0 {
            let handle = engine
                .mount_handle(SizeSpec::new(Size::Px(handle_px)))
                .expect("mount handle");
            handles.push(handle);
        }
        panes.push(engine.mount_pane(decl.spec()).expect("mount pane"));
    }
    Fixture {
        engine,
        panes,
        handles,
    }
}

fn layout_strategy() -> impl Strategy<Value = (f64, Vec<PaneDecl>, f64)> {
    (
        800u32..=2400,
        prop::collection::vec(pane_strategy(), 1..=5),
        1u32..=4,
        0u32..=8,
    )
        .prop_map(|(container, mut decls, fr, handle)| {
            // At least one fraction pane keeps the container filled.
            decls.push(PaneDecl::Fraction(f64::from(fr)));
            (f64::from(container), decls, f64::from(handle))
        })
}

fn assert_invariants(fixture: &Fixture) -> Result<(), TestCaseError> {
    let engine = &fixture.engine;
    let container = engine.container_size();
    let total = engine.total_track_px();
    prop_assert!(
        (total - container).abs() < TOLERANCE * container.max(1.0),
        "tracks sum to {total}, container is {container}"
    );
    for id in &fixture.panes {
        let spec = *engine.spec(*id).expect("pane stays registered");
        if spec.is_fraction() {
            let fraction = engine.effective_fraction(*id).expect("fraction pane");
            prop_assert!(fraction >= -1e-12, "fraction {fraction} went negative");
        } else {
            let px = engine.track_px(*id).expect("pane size");
            let (lo, hi) = spec.pixel_range(container);
            prop_assert!(px >= lo - TOLERANCE, "{px}px below lower bound {lo}px");
            prop_assert!(px <= hi + TOLERANCE, "{px}px above upper bound {hi}px");
        }
    }
    Ok(())
}

fn offsets_snapshot(engine: &ResizeEngine) -> Vec<(NodeId, f64)> {
    let mut offsets: Vec<_> = engine.offsets().iter().collect();
    offsets.sort_by_key(|(id, _)| *id);
    offsets
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn drags_preserve_layout_invariants(
        (container, decls, handle_px) in layout_strategy(),
        steps in prop::collection::vec((any::<prop::sample::Index>(), -400i32..=400), 1..40),
    ) {
        let mut fixture = build(container, &decls, handle_px);
        let fixed: f64 = fixture
            .panes
            .iter()
            .filter_map(|id| {
                let spec = fixture.engine.spec(*id)?;
                (!spec.is_fraction()).then(|| fixture.engine.track_px(*id)).flatten()
            })
            .sum::<f64>()
            + handle_px * fixture.handles.len() as f64;
        prop_assume!(fixed < container);
        assert_invariants(&fixture)?;

        for (pick, delta) in steps {
            let handle = fixture.handles[pick.index(fixture.handles.len())];
            let outcome = fixture.engine.drag_handle(handle, f64::from(delta));
            prop_assert!(outcome.diagnostic.is_none());
            prop_assert!((outcome.applied + outcome.overflow - outcome.requested).abs() < TOLERANCE);
            prop_assert!(outcome.applied * outcome.requested >= 0.0, "applied against the pointer");
            assert_invariants(&fixture)?;
        }
    }

    #[test]
    fn zero_delta_never_mutates_offsets(
        (container, decls, handle_px) in layout_strategy(),
        warmup in prop::collection::vec((any::<prop::sample::Index>(), -200i32..=200), 0..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut fixture = build(container, &decls, handle_px);
        for (index, delta) in warmup {
            let handle = fixture.handles[index.index(fixture.handles.len())];
            fixture.engine.drag_handle(handle, f64::from(delta));
        }
        let before = offsets_snapshot(&fixture.engine);
        let handle = fixture.handles[pick.index(fixture.handles.len())];
        let outcome = fixture.engine.drag_handle(handle, 0.0);
        prop_assert!(!outcome.is_clamped());
        prop_assert_eq!(offsets_snapshot(&fixture.engine), before);
    }

    #[test]
    fn container_resize_keeps_fractions_filling_space(
        (container, decls, handle_px) in layout_strategy(),
        steps in prop::collection::vec((any::<prop::sample::Index>(), -200i32..=200), 1..10),
        resized in 800u32..=2400,
    ) {
        let mut fixture = build(container, &decls, handle_px);
        for (index, delta) in steps {
            let handle = fixture.handles[index.index(fixture.handles.len())];
            fixture.engine.drag_handle(handle, f64::from(delta));
        }
        let resized = f64::from(resized);
        fixture.engine.set_container_size(resized);
        let fixed: f64 = fixture
            .engine
            .order()
            .iter()
            .filter_map(|id| {
                let spec = fixture.engine.spec(*id)?;
                (!spec.is_fraction()).then(|| fixture.engine.track_px(*id)).flatten()
            })
            .sum();
        prop_assume!(fixed < resized);
        assert_invariants(&fixture)?;
    }

    #[test]
    fn unmeasured_container_stays_finite(
        (_, decls, handle_px) in layout_strategy(),
        steps in prop::collection::vec((any::<prop::sample::Index>(), -200i32..=200), 1..20),
    ) {
        let mut fixture = build(0.0, &decls, handle_px);
        for (index, delta) in steps {
            let handle = fixture.handles[index.index(fixture.handles.len())];
            let outcome = fixture.engine.drag_handle(handle, f64::from(delta));
            prop_assert!((outcome.applied + outcome.overflow - outcome.requested).abs() < TOLERANCE);
        }
        for id in &fixture.panes {
            let px = fixture.engine.track_px(*id).expect("pane size");
            prop_assert!(px.is_finite() && px >= 0.0, "pane resolved to {px}px");
            if matches!(fixture.engine.spec(*id).map(SizeSpec::size), Some(Size::Percent(_))) {
                prop_assert_eq!(fixture.engine.offsets().get(*id), 0.0);
            }
        }
    }
}
