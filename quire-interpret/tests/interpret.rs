mod common;

use common::{Event, HELVETICA, PageBuilder, run, run_with};
use kurbo::Rect;
use quire_interpret::{Intent, InterpreterSettings, InterpreterWarning, MaskType};
use quire_syntax::ErrorKind;

const BLACK: [u8; 4] = [0, 0, 0, 255];
const RED: [u8; 4] = [255, 0, 0, 255];

fn path(fill: Option<[u8; 4]>, stroke: Option<[u8; 4]>, bounds: (f64, f64, f64, f64)) -> Event {
    Event::Path {
        fill,
        stroke,
        bounds: Rect::new(bounds.0, bounds.1, bounds.2, bounds.3),
    }
}

fn form(content: &str) -> PageBuilder {
    PageBuilder::new()
        .resources("/XObject << /Fm0 5 0 R >>")
        .stream(5, "/Type /XObject /Subtype /Form /BBox [0 0 100 100]", content.as_bytes())
}

#[test]
fn fill_and_stroke() {
    let doc = PageBuilder::new().build("1 0 0 rg 0 0 1 RG 10 10 50 50 re B");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(
        run.device.events,
        vec![path(Some(RED), Some([0, 0, 255, 255]), (10.0, 140.0, 60.0, 190.0))]
    );
}

#[test]
fn translated_fill() {
    let doc = PageBuilder::new().build("1 0 0 1 10 10 cm 0 0 100 100 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(
        run.device.events,
        vec![path(Some(BLACK), None, (10.0, 90.0, 110.0, 190.0))]
    );
}

#[test]
fn empty_path_is_not_painted() {
    let doc = PageBuilder::new().build("f 10 10 l S");
    let run = run(&doc);

    assert!(run.device.events.is_empty());
}

#[test]
fn clips_are_balanced() {
    let doc = PageBuilder::new().build("q 0 0 10 10 re W n 0 0 5 5 re f Q 0 0 20 20 re W* n");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![
            Event::PushClip,
            path(Some(BLACK), None, (0.0, 195.0, 5.0, 200.0)),
            Event::PopClip,
            Event::PushClip,
            Event::PopClip,
        ]
    );
}

#[test]
fn nested_save_restore() {
    let doc = PageBuilder::new().build(
        "q 1 0 0 rg 2 0 0 2 0 0 cm \
         q 0 0 1 rg 0 0 5 5 re W n Q \
         q 0 0 0 0 k 1 0 0 1 50 50 cm 0 0 10 10 re W n Q \
         Q 0 0 10 10 re f",
    );
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert!(run.device.is_balanced());
    assert_eq!(
        run.device.events,
        vec![
            Event::PushClip,
            Event::PopClip,
            Event::PushClip,
            Event::PopClip,
            path(Some(BLACK), None, (0.0, 190.0, 10.0, 200.0)),
        ]
    );
}

#[test]
fn state_stack_limit() {
    let content = format!("{}0 0 1 1 re W n{}0 0 1 1 re f", "q ".repeat(40), " Q".repeat(40));
    let doc = PageBuilder::new().build(&content);
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert!(run.device.is_balanced());
    // Every Q, including those of ignored q operators, is consumed, so the
    // clip is gone before the last path.
    assert_eq!(run.device.events.last(), Some(&path(Some(BLACK), None, (0.0, 199.0, 1.0, 200.0))));
    assert_eq!(run.device.events[run.device.events.len() - 2], Event::PopClip);
}

#[test]
fn unbalanced_restore() {
    let doc = PageBuilder::new().build("Q Q 0 0 1 1 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(run.device.paths().len(), 1);
}

#[test]
fn unknown_operators() {
    let doc = PageBuilder::new().build("0 0 m foo BX bar 1 2 baz EX");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(run.warnings, vec![InterpreterWarning::UnknownOperator]);
}

#[test]
fn failed_operator_is_skipped() {
    let doc = PageBuilder::new()
        .resources("/ExtGState << /GS0 42 >>")
        .build("/GS0 gs 0 0 1 1 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(
        run.warnings,
        vec![InterpreterWarning::OperatorFailed(ErrorKind::TypeCheck)]
    );
    assert_eq!(run.device.paths().len(), 1);
}

#[test]
fn missing_resource_aborts_page() {
    let doc = PageBuilder::new().build("q 0 0 10 10 re W n /Missing Do 0 0 5 5 re f");
    let run = run(&doc);

    assert_eq!(run.result.unwrap_err().kind(), ErrorKind::ResourceNotFound);
    assert!(run.warnings.contains(&InterpreterWarning::ResourceNotFound));
    assert!(run.device.paths().is_empty());
    assert_eq!(run.device.events, vec![Event::PushClip, Event::PopClip]);
}

#[test]
fn text_is_batched() {
    let doc = PageBuilder::new()
        .resources("/Font << /F1 5 0 R >>")
        .object(5, HELVETICA)
        .build("BT /F1 12 Tf 10 10 Td (Hello) Tj [( W) -20 (orld)] TJ ET");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![Event::Text {
            text: "Hello World".to_string(),
            font_size: 12.0,
            fill: Some(BLACK),
        }]
    );
}

#[test]
fn text_flush_points() {
    let doc = PageBuilder::new()
        .resources("/Font << /F1 5 0 R >>")
        .object(5, HELVETICA)
        .build("BT /F1 12 Tf (A) Tj 1 0 0 rg (B) Tj 0 0 1 1 re f (C) Tj /F1 24 Tf (D) Tj ET");
    let run = run(&doc);

    let kinds = run
        .device
        .events
        .iter()
        .map(|e| match e {
            Event::Text { text, .. } => text.clone(),
            Event::Path { .. } => "path".to_string(),
            other => panic!("unexpected {other:?}"),
        })
        .collect::<Vec<_>>();

    assert_eq!(kinds, ["A", "B", "path", "C", "D"]);
    assert!(matches!(
        &run.device.events[1],
        Event::Text { fill: Some(RED), .. }
    ));
    assert!(matches!(
        &run.device.events[4],
        Event::Text { font_size: 24.0, .. }
    ));
}

#[test]
fn text_clip() {
    let doc = PageBuilder::new()
        .resources("/Font << /F1 5 0 R >>")
        .object(5, HELVETICA)
        .build("BT /F1 12 Tf 7 Tr (A) Tj ET 0 0 5 5 re f");
    let run = run(&doc);

    assert!(matches!(run.device.events[0], Event::Text { .. }));
    assert_eq!(run.device.events[1], Event::PushClip);
    assert!(matches!(run.device.events[2], Event::Path { .. }));
    assert_eq!(run.device.events[3], Event::PopClip);
}

#[test]
fn missing_font() {
    let doc = PageBuilder::new().build("BT (A) Tj ET 0 0 1 1 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(
        run.warnings,
        vec![InterpreterWarning::OperatorFailed(ErrorKind::MissingRequiredEntry)]
    );
    assert_eq!(run.device.paths().len(), 1);
}

#[test]
fn type3_glyphs() {
    let doc = PageBuilder::new()
        .resources("/Font << /F1 5 0 R >>")
        .object(
            5,
            "<< /Type /Font /Subtype /Type3 /FontBBox [0 0 1000 1000] \
             /FontMatrix [0.001 0 0 0.001 0 0] /CharProcs << /a 6 0 R >> \
             /Encoding << /Differences [97 /a] >> /FirstChar 97 /LastChar 97 /Widths [1000] >>",
        )
        .stream(6, "", b"1000 0 d0 0 0 1000 1000 re f")
        .build("BT /F1 10 Tf (a) Tj ET");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![
            Event::Text {
                text: "a".to_string(),
                font_size: 10.0,
                fill: Some(BLACK),
            },
            path(Some(BLACK), None, (0.0, 190.0, 10.0, 200.0)),
        ]
    );
}

#[test]
fn ext_g_state_alpha() {
    let doc = PageBuilder::new()
        .resources("/ExtGState << /GS0 << /ca 0.5 /LW 4 >> >>")
        .build("/GS0 gs 0 0 10 10 re f");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![path(Some([0, 0, 0, 128]), None, (0.0, 190.0, 10.0, 200.0))]
    );
}

#[test]
fn form_x_object() {
    let doc = PageBuilder::new()
        .resources("/XObject << /Fm0 5 0 R >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Form /BBox [0 0 100 100] /Matrix [1 0 0 1 20 20]",
            b"0 0 10 10 re f",
        )
        .build("/Fm0 Do");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![
            Event::PushClip,
            path(Some(BLACK), None, (20.0, 170.0, 30.0, 180.0)),
            Event::PopClip,
        ]
    );
}

#[test]
fn transparency_group() {
    let doc = PageBuilder::new()
        .resources("/XObject << /Fm0 5 0 R >> /ExtGState << /GS0 << /ca 0.5 >> >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Form /BBox [0 0 100 100] /Group << /S /Transparency >>",
            b"0 0 10 10 re f",
        )
        .build("/GS0 gs /Fm0 Do");
    let run = run(&doc);

    // The group carries the alpha, the content is opaque.
    assert_eq!(
        run.device.events,
        vec![
            Event::PushGroup {
                opacity: 0.5,
                soft_mask: false,
            },
            Event::PushClip,
            path(Some(BLACK), None, (0.0, 190.0, 10.0, 200.0)),
            Event::PopClip,
            Event::PopGroup,
        ]
    );
}

#[test]
fn form_resources_fall_back_to_page() {
    let doc = form("/F1 12 Tf BT (x) Tj ET")
        .resources("/XObject << /Fm0 5 0 R >> /Font << /F1 6 0 R >>")
        .object(6, HELVETICA)
        .build("/Fm0 Do");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(run.device.texts(), vec!["x"]);
}

#[test]
fn recursive_form_is_bounded() {
    let doc = PageBuilder::new()
        .resources("/XObject << /Fm0 5 0 R >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Form /BBox [0 0 100 100] \
             /Resources << /XObject << /Fm0 5 0 R >> >>",
            b"0 0 1 1 re f /Fm0 Do",
        )
        .build("/Fm0 Do");
    let settings = InterpreterSettings {
        max_form_depth: 4,
        ..Default::default()
    };
    let run = run_with(&doc, settings);

    assert!(run.result.is_ok());
    assert!(run.device.is_balanced());
    assert_eq!(run.device.paths().len(), 4);
}

#[test]
fn optional_content() {
    let doc = PageBuilder::new()
        .catalog_entries("/OCProperties << /OCGs [5 0 R] /D << /OFF [5 0 R] >> >>")
        .object(5, "<< /Type /OCG /Name (hidden) >>")
        .resources("/Properties << /oc1 5 0 R >>")
        .build("/OC /oc1 BDC 0 0 10 10 re f /Tag BMC 0 0 1 1 re f EMC EMC 0 0 5 5 re f");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![path(Some(BLACK), None, (0.0, 195.0, 5.0, 200.0))]
    );
}

#[test]
fn optional_content_in_forms() {
    let doc = PageBuilder::new()
        .catalog_entries("/OCProperties << /OCGs [6 0 R] /D << /OFF [6 0 R] >> >>")
        .resources("/XObject << /Fm0 5 0 R >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Form /BBox [0 0 100 100] /OC 6 0 R",
            b"0 0 10 10 re f",
        )
        .object(6, "<< /Type /OCG /Name (hidden) >>")
        .build("/Fm0 Do");
    let run = run(&doc);

    assert!(run.device.events.is_empty());
}

#[test]
fn soft_mask() {
    let doc = PageBuilder::new()
        .resources("/ExtGState << /GS0 << /SMask << /S /Luminosity /G 5 0 R >> >> >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Form /BBox [0 0 50 50] \
             /Group << /S /Transparency /CS /DeviceGray >>",
            b"1 g 0 0 50 50 re f",
        )
        .build("/GS0 gs 0 0 10 10 re f");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![
            Event::BeginSoftMask(MaskType::Luminosity),
            Event::PushGroup {
                opacity: 1.0,
                soft_mask: false,
            },
            Event::PushClip,
            path(Some([255, 255, 255, 255]), None, (0.0, 150.0, 50.0, 200.0)),
            Event::PopClip,
            Event::PopGroup,
            Event::EndSoftMask,
            Event::PushGroup {
                opacity: 1.0,
                soft_mask: true,
            },
            path(Some(BLACK), None, (0.0, 190.0, 10.0, 200.0)),
            Event::PopGroup,
        ]
    );
}

#[test]
fn image_x_object() {
    let doc = PageBuilder::new()
        .resources("/XObject << /Im0 5 0 R >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Image /Width 2 /Height 1 /ColorSpace /DeviceGray \
             /BitsPerComponent 8",
            &[0x00, 0xff],
        )
        .build("q 20 0 0 10 0 0 cm /Im0 Do Q");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![Event::Image {
            width: 2,
            height: 1,
            alpha: 1.0,
        }]
    );
}

#[test]
fn stencil_mask() {
    let doc = PageBuilder::new()
        .resources("/XObject << /Im0 5 0 R >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Image /Width 1 /Height 1 /ImageMask true",
            &[0x00],
        )
        .build("1 0 0 rg /Im0 Do");
    let run = run(&doc);

    assert_eq!(run.device.events, vec![Event::Stencil { color: RED }]);
}

#[test]
fn broken_image() {
    let doc = PageBuilder::new()
        .resources("/XObject << /Im0 5 0 R >>")
        .stream(
            5,
            "/Type /XObject /Subtype /Image /Width 0 /Height 1 /ColorSpace /DeviceGray \
             /BitsPerComponent 8",
            &[0x00],
        )
        .build("/Im0 Do 0 0 1 1 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(run.warnings, vec![InterpreterWarning::ImageDecodeFailure]);
    assert_eq!(run.device.paths().len(), 1);
}

#[test]
fn inline_images() {
    let doc = PageBuilder::new()
        .resources("/ColorSpace << /CS0 [/Indexed /DeviceRGB 1 <FF000000FF00>] >>")
        .build(
            "BI /W 2 /H 1 /CS /G /BPC 8 /F /AHx ID 00FF> EI \
             BI /W 1 /H 1 /CS /CS0 /BPC 8 /F /AHx ID 01> EI 0 0 1 1 re f",
        );
    let run = run(&doc);

    assert!(run.warnings.is_empty());
    assert_eq!(
        run.device.events[..2],
        [
            Event::Image {
                width: 2,
                height: 1,
                alpha: 1.0,
            },
            Event::Image {
                width: 1,
                height: 1,
                alpha: 1.0,
            },
        ]
    );
    assert_eq!(run.device.paths().len(), 1);
}

#[test]
fn oversized_inline_image() {
    let doc = PageBuilder::new()
        .build("BI /W 4294967296 /H 4294967296 /CS /G /BPC 8 ID x EI 0 0 1 1 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert_eq!(run.warnings, vec![InterpreterWarning::ImageDecodeFailure]);
    assert_eq!(run.device.events, vec![path(Some(BLACK), None, (0.0, 199.0, 1.0, 200.0))]);
}

#[test]
fn shading_operator() {
    let function = "<< /FunctionType 2 /Domain [0 1] /C0 [1 0 0] /C1 [0 0 1] /N 1 >>";
    let doc = PageBuilder::new()
        .resources(&format!(
            "/Shading << \
             /Sh0 << /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 100 0] /Function {function} >> \
             /Sh1 << /ShadingType 2 /ColorSpace /DeviceRGB /Coords [0 0 100 0] /Function {function} \
             /BBox [0 0 10 10] >> >>"
        ))
        .build("/Sh0 sh /Sh1 sh");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![
            Event::Shading { bounds: None },
            Event::PushClip,
            Event::Shading {
                bounds: Some(Rect::new(0.0, 190.0, 10.0, 200.0)),
            },
            Event::PopClip,
        ]
    );
}

#[test]
fn tiling_pattern() {
    let doc = PageBuilder::new()
        .resources("/Pattern << /P0 5 0 R >>")
        .stream(
            5,
            "/PatternType 1 /PaintType 1 /TilingType 1 /BBox [0 0 10 10] \
             /XStep 10 /YStep 10 /Resources << >>",
            b"1 0 0 rg 0 0 5 5 re f",
        )
        .build("/Pattern cs /P0 scn 0 0 20 20 re f");
    let run = run(&doc);

    assert!(run.result.is_ok());
    assert!(run.device.is_balanced());
    assert_eq!(run.device.events[0], Event::PushClip);

    let paths = run.device.paths();
    assert!(paths.len() >= 4);
    assert!(
        paths
            .iter()
            .all(|p| matches!(p, Event::Path { fill: Some(RED), .. }))
    );
}

#[test]
fn tiling_pattern_limit() {
    let doc = PageBuilder::new()
        .resources("/Pattern << /P0 5 0 R >>")
        .stream(
            5,
            "/PatternType 1 /PaintType 1 /TilingType 1 /BBox [0 0 1 1] \
             /XStep 1 /YStep 1 /Resources << >>",
            b"0 0 1 1 re f",
        )
        .build("/Pattern cs /P0 scn 0 0 100 100 re f");
    let settings = InterpreterSettings {
        max_pattern_tiles: 10,
        ..Default::default()
    };
    let run = run_with(&doc, settings);

    assert!(run.warnings.contains(&InterpreterWarning::PatternTileLimit));
    assert!(run.device.paths().len() <= 10);
    assert!(run.device.is_balanced());
}

#[test]
fn uncolored_pattern_uses_tint() {
    let doc = PageBuilder::new()
        .resources("/Pattern << /P0 5 0 R >> /ColorSpace << /CS0 [/Pattern /DeviceRGB] >>")
        .stream(
            5,
            "/PatternType 1 /PaintType 2 /TilingType 1 /BBox [0 0 10 10] \
             /XStep 10 /YStep 10 /Resources << >>",
            b"0 0 1 rg 0 0 5 5 re f",
        )
        .build("/CS0 cs 1 0 0 /P0 scn 0 0 10 10 re f");
    let run = run(&doc);

    let paths = run.device.paths();
    assert!(!paths.is_empty());
    // Color operators in the cell are ignored.
    assert!(
        paths
            .iter()
            .all(|p| matches!(p, Event::Path { fill: Some(RED), .. }))
    );
}

fn annotated(annotations: &str) -> PageBuilder {
    PageBuilder::new()
        .page_entries(&format!("/Annots [{annotations}]"))
        .stream(6, "/Type /XObject /Subtype /Form /BBox [0 0 10 10]", b"0 0 10 10 re f")
        .stream(
            8,
            "/Type /XObject /Subtype /Form /BBox [0 0 10 10]",
            b"1 0 0 rg 0 0 10 10 re f",
        )
}

#[test]
fn annotation_appearance() {
    let doc = annotated("5 0 R 7 0 R")
        .object(
            5,
            "<< /Type /Annot /Subtype /Square /Rect [10 10 30 30] /F 4 /AP << /N 6 0 R >> >>",
        )
        .object(
            7,
            "<< /Type /Annot /Subtype /Square /Rect [50 50 60 60] /F 6 /AP << /N 6 0 R >> >>",
        )
        .build("");
    let run = run(&doc);

    assert_eq!(
        run.device.events,
        vec![
            Event::PushClip,
            path(Some(BLACK), None, (10.0, 170.0, 30.0, 190.0)),
            Event::PopClip,
        ]
    );

    let settings = InterpreterSettings {
        render_annotations: false,
        ..Default::default()
    };
    assert!(run_with(&doc, settings).device.events.is_empty());
}

#[test]
fn annotation_flags_by_intent() {
    let doc = annotated("5 0 R")
        .object(
            5,
            "<< /Type /Annot /Subtype /Square /Rect [0 0 10 10] /F 36 /AP << /N 6 0 R >> >>",
        )
        .build("");

    assert!(run(&doc).device.paths().is_empty());

    let settings = InterpreterSettings {
        intent: Intent::Print,
        ..Default::default()
    };
    assert_eq!(run_with(&doc, settings).device.paths().len(), 1);
}

#[test]
fn annotation_appearance_state() {
    let doc = annotated("5 0 R")
        .object(
            5,
            "<< /Type /Annot /Subtype /Widget /Rect [0 0 10 10] /AS /Off \
             /AP << /N << /On 6 0 R /Off 8 0 R >> >> >>",
        )
        .build("");
    let run = run(&doc);

    assert_eq!(
        run.device.paths(),
        vec![&path(Some(RED), None, (0.0, 190.0, 10.0, 200.0))]
    );
}
