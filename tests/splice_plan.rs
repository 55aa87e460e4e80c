use std::path::Path;
use synoid_splice::agent::splice_plan::{SegmentSource, SpliceLayout, SplicePlan};

#[test]
fn test_identical_inputs_give_identical_plans() {
    let slide = Path::new("slides/walk.png");
    let mantra = Path::new("mantras/breathe.png");

    let first = SplicePlan::build(42.5, 4.2, 38.0, slide, Some(mantra));
    let second = SplicePlan::build(42.5, 4.2, 38.0, slide, Some(mantra));
    assert_eq!(first, second);
    assert!((first.total_duration() - 42.5).abs() < 1e-9);
}

#[test]
fn test_twenty_second_splice_layout() {
    let plan = SplicePlan::build(
        20.0,
        3.0,
        17.0,
        Path::new("intro.png"),
        Some(Path::new("outro.png")),
    );
    assert_eq!(plan.layout, SpliceLayout::Full);

    let mut clock = 0.0;
    let spans: Vec<(f64, f64)> = plan
        .segments
        .iter()
        .map(|s| {
            let span = (clock, clock + s.duration);
            clock += s.duration;
            span
        })
        .collect();
    assert_eq!(spans, vec![(0.0, 3.0), (3.0, 17.0), (17.0, 20.0)]);

    assert_eq!(
        plan.segments[0].source,
        SegmentSource::Still {
            image: "intro.png".into()
        }
    );
    assert_eq!(
        plan.segments[2].source,
        SegmentSource::Still {
            image: "outro.png".into()
        }
    );
}

#[test]
fn test_short_video_fallbacks() {
    let slide = Path::new("s.png");
    let mantra = Some(Path::new("m.png"));

    let overlap = SplicePlan::build(8.0, 5.0, 4.0, slide, mantra);
    assert_eq!(overlap.layout, SpliceLayout::IntroAndRemainder);
    assert!((overlap.total_duration() - 8.0).abs() < 1e-9);

    let intro_only = SplicePlan::build(3.0, 5.0, 0.0, slide, mantra);
    assert_eq!(intro_only.layout, SpliceLayout::IntroOnly);
    assert_eq!(intro_only.segments.len(), 1);
}
