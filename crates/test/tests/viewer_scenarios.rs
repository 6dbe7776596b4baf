use leafview_application::{
    AppContext, OpenAttempt, OpenError, OpenProgress, OpenState, TocTree, ViewerError,
    ViewerEvent, open_document,
};
use leafview_core::{Config, Document, DpiScale, Rotation, Severity, TocEntry};
use leafview_storage::Storage;
use leafview_test::{FakeDocument, FakeOpener, make_viewer, write_file};

const PAGES: [(u32, u32); 3] = [(100, 140), (100, 140), (100, 140)];

#[test]
fn page_offsets_increase_with_page_number() {
    let (viewer, _) = make_viewer(&[(100, 140), (80, 60), (120, 300), (90, 90)], (300, 200));
    let offsets: Vec<u32> = (1..=4).filter_map(|p| viewer.page_offset(p)).collect();
    assert_eq!(offsets, vec![10, 162, 234, 546]);
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(viewer.page_offset(0), None);
    assert_eq!(viewer.page_offset(5), None);
}

#[test]
fn scrolling_tracks_the_most_visible_page() {
    let (mut viewer, events) = make_viewer(&PAGES, (300, 200));
    assert_eq!(viewer.current_page(), 1);

    viewer.set_scroll(0, 150);
    assert_eq!(viewer.current_page(), 2);
    assert_eq!(viewer.page_field(), "2");
    assert_eq!(events.drain(), vec![ViewerEvent::CurrentPageChanged(2)]);

    viewer.scroll_by(0, 10_000);
    assert_eq!(viewer.scroll(), (0, 264));
    assert_eq!(viewer.current_page(), 3);
}

#[test]
fn invalid_page_input_reverts_the_field_every_time() {
    let (mut viewer, events) = make_viewer(&PAGES, (300, 200));
    viewer.go_to_page(2).expect("page 2 exists");
    events.drain();

    for _ in 0..2 {
        assert_eq!(
            viewer.submit_page_field("7"),
            Err(ViewerError::PageIndexOutOfRange {
                page: 7,
                page_count: 3
            })
        );
        assert_eq!(viewer.page_field(), "2");
        assert_eq!(viewer.current_page(), 2);
    }
    assert!(matches!(
        viewer.submit_page_field("two"),
        Err(ViewerError::NonNumericPageInput { .. })
    ));
    assert_eq!(viewer.page_field(), "2");

    let warnings = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ViewerEvent::Notify(n) if n.severity == Severity::Warning))
        .count();
    assert_eq!(warnings, 3);
}

#[test]
fn last_page_is_clamped_to_the_scroll_range() {
    let (mut viewer, _) = make_viewer(&PAGES, (300, 200));
    viewer.last_page().expect("last page");
    assert_eq!(viewer.current_page(), 3);
    assert_eq!(viewer.scroll().1, 264);
}

#[test]
fn zoom_stops_at_the_upper_bound_with_one_warning_per_press() {
    let (mut viewer, events) = make_viewer(&PAGES, (300, 200));
    for _ in 0..10 {
        assert!(viewer.zoom_in());
    }
    assert_eq!(viewer.zoom(), 200);
    events.drain();

    for _ in 0..3 {
        assert!(!viewer.zoom_in());
    }
    assert_eq!(viewer.zoom(), 200);
    let drained = events.drain();
    let limits = drained
        .iter()
        .filter(|e| **e == ViewerEvent::ZoomLimitReached { limit: 200 })
        .count();
    let warnings = drained
        .iter()
        .filter(|e| matches!(e, ViewerEvent::Notify(n) if n.severity == Severity::Warning))
        .count();
    assert_eq!((limits, warnings), (3, 3));
    assert_eq!(viewer.pages()[0].size(), (200, 280));
}

#[test]
fn four_rotations_restore_the_original_pixels() {
    let (mut viewer, _) = make_viewer(&[(60, 90)], (300, 200));
    let original = viewer.pages()[0].displayed().clone();

    viewer.rotate();
    assert_eq!(viewer.rotation(), Rotation::Deg90);
    assert_eq!(viewer.pages()[0].size(), (90, 60));
    assert_ne!(viewer.pages()[0].displayed(), &original);

    for _ in 0..3 {
        viewer.rotate();
    }
    assert_eq!(viewer.rotation(), Rotation::Deg0);
    assert_eq!(viewer.pages()[0].displayed(), &original);
}

#[test]
fn four_rotations_restore_a_zoomed_page() {
    let (mut viewer, _) = make_viewer(&[(60, 90), (70, 50)], (300, 200));
    viewer.zoom_in();
    viewer.zoom_in();
    assert_eq!(viewer.zoom(), 120);
    let before: Vec<_> = viewer.pages().iter().map(|p| p.displayed().clone()).collect();
    assert_eq!(before[0].dimensions(), (72, 108));

    viewer.rotate();
    assert_eq!(viewer.pages()[0].size(), (108, 72));
    for _ in 0..3 {
        viewer.rotate();
    }
    assert_eq!(viewer.zoom(), 120);
    for (page, expected) in viewer.pages().iter().zip(&before) {
        assert_eq!(page.displayed(), expected);
    }
}

#[test]
fn fit_width_follows_viewport_and_rotation() {
    let (mut viewer, events) = make_viewer(&[(200, 100)], (300, 200));
    viewer.toggle_fit_width();
    assert!(viewer.is_fit_width());
    // (300 - 40) * 100 / 200
    assert_eq!(viewer.zoom(), 130);

    viewer.rotate();
    // Rotated reference width is 100, so the clamp kicks in.
    assert_eq!(viewer.zoom(), 200);

    viewer.zoom_out();
    assert!(!viewer.is_fit_width());
    assert_eq!(viewer.zoom(), 190);
    assert!(events.drain().contains(&ViewerEvent::FitModeChanged(false)));
}

#[test]
fn outline_levels_become_a_forest() {
    let tree = TocTree::build(&[
        TocEntry::new(1, "A", Some(1)),
        TocEntry::new(2, "B", Some(2)),
        TocEntry::new(2, "C", Some(3)),
        TocEntry::new(1, "D", Some(5)),
    ]);
    assert_eq!(tree.roots(), &[0, 3]);
    assert_eq!(tree.children(0), &[1, 2]);
    assert_eq!(tree.parent(2), Some(0));
    assert!(tree.children(3).is_empty());
    assert_eq!(tree.path(2), vec!["A", "C"]);
    assert_eq!(tree.nearest_entry_for_page(4), Some(2));
}

#[test]
fn second_password_attempt_opens_and_keeps_the_password() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_file(dir.path(), "vault.pdf", b"%PDF")?;
    let opener = FakeOpener {
        template: FakeDocument::new(&PAGES).locked("s3cret"),
    };
    let mut app = AppContext::new(Config::default());

    assert_eq!(app.open_path(&opener, &path), OpenProgress::AwaitingPassword);
    assert_eq!(app.submit_password("guess"), OpenProgress::AwaitingPassword);
    assert_eq!(app.submit_password("s3cret"), OpenProgress::Opened(0));

    let tab = app.tabs.active().expect("tab opened");
    assert_eq!(tab.password.as_deref(), Some("s3cret"));
    assert_eq!(tab.viewer.page_count(), 3);
    assert!(!tab.document.is_encrypted());
    assert_eq!(tab.info.get("Encryption"), Some("Encrypted"));
    Ok(())
}

#[test]
fn cancelled_prompt_releases_the_handle() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_file(dir.path(), "vault.pdf", b"%PDF")?;
    let opener = FakeOpener {
        template: FakeDocument::new(&PAGES).locked("s3cret"),
    };

    let mut attempt = OpenAttempt::start(&opener, &path);
    assert!(attempt.holds_document());
    attempt.cancel();
    assert!(!attempt.holds_document());
    assert_eq!(attempt.state(), &OpenState::Aborted);

    let mut prompt = |_: &std::path::Path, _: bool| -> Option<String> { None };
    assert_eq!(
        open_document(&opener, &path, &mut prompt).err(),
        Some(OpenError::UserAbortedAuthentication)
    );
    Ok(())
}

#[test]
fn unreadable_image_is_rejected_before_a_tab_exists() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_file(dir.path(), "scan.png", b"\x89PNG")?;
    let opener = FakeOpener {
        template: FakeDocument::new(&PAGES).unreadable_image(),
    };
    let mut app = AppContext::new(Config::default());

    assert_eq!(app.open_path(&opener, &path), OpenProgress::Failed);
    assert!(app.tabs.is_empty());
    let note = app.notifications.back().expect("notification");
    assert_eq!(note.severity, Severity::Error);
    assert_eq!(note.message, "File is not suitable or is corrupted.");
    Ok(())
}

#[test]
fn folders_and_unknown_extensions_are_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let opener = FakeOpener {
        template: FakeDocument::new(&PAGES),
    };
    let notes = write_file(dir.path(), "notes.docx", b"hello")?;

    assert_eq!(
        OpenAttempt::start(&opener, dir.path()).error(),
        Some(OpenError::NotAFile)
    );
    assert_eq!(
        OpenAttempt::start(&opener, &notes).error(),
        Some(OpenError::UnsupportedFormat)
    );
    Ok(())
}

#[test]
fn dpi_choice_survives_a_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = Storage::open_in_dir(dir.path())?;
    let mut config = storage.load_config()?;
    assert_eq!(config.dpi_scale, DpiScale::Auto);

    config.dpi_scale = config.dpi_scale.cycle();
    storage.save_config(&config)?;

    let reopened = Storage::open_in_dir(dir.path())?;
    assert_eq!(reopened.load_config()?.dpi_scale, DpiScale::X100);
    Ok(())
}
