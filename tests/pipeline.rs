use zenglitch::{
    CurveOrder, DecodeError, GlitchError, HilbertCurve, Pass, Pipeline, Pixel, PixelBuffer,
    PreconditionViolation, ReorderConfig, ReorderEngine, ReorderMode, ResourceLimits, SortAlgorithm,
    SortKey, Traversal, is_permutation, opaque, ppm,
};

fn noise(width: usize, height: usize) -> PixelBuffer {
    let mut state = 0x2545_f491u32;
    let pixels = (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            opaque(r, g, b)
        })
        .collect();
    PixelBuffer::from_pixels(pixels, width, height).unwrap()
}

fn sorted(buf: &PixelBuffer) -> Vec<Pixel> {
    let mut v = buf.pixels().to_vec();
    v.sort_unstable_by_key(|p| (p.r, p.g, p.b, p.a));
    v
}

fn ppm_bytes(buf: &PixelBuffer) -> Vec<u8> {
    ppm::encode(buf, 255).unwrap()
}

#[test]
fn order_two_curve_scenario() {
    let curve = HilbertCurve::new(2).unwrap();
    assert_eq!(curve.cells(), 16);
    assert_eq!(curve.distance_of(0, 0).unwrap(), 0);
    let a = curve.distance_of(1, 0).unwrap();
    let b = curve.distance_of(1, 1).unwrap();
    assert_eq!(a.abs_diff(b), 1);

    let original = noise(4, 4);
    let order = CurveOrder::hilbert(4, 4).unwrap();
    let mapped = ReorderEngine::new(ReorderConfig::remap())
        .unwrap()
        .apply_to_copy(&original, &order)
        .unwrap();
    assert_ne!(mapped, original);
    let restored = ReorderEngine::new(ReorderConfig::unmap())
        .unwrap()
        .apply_to_copy(&mapped, &order)
        .unwrap();
    assert_eq!(restored, original);
}

#[test]
fn order_for_four_by_four_buffer_rejects_three_by_three() {
    let order = CurveOrder::hilbert(4, 4).unwrap();
    let mut buf = noise(3, 3);
    let before = buf.clone();
    let err = ReorderEngine::new(ReorderConfig::new())
        .unwrap()
        .apply(&mut buf, &order)
        .unwrap_err();
    assert_eq!(
        err,
        PreconditionViolation::DimensionMismatch {
            expected_width: 4,
            expected_height: 4,
            actual_width: 3,
            actual_height: 3,
        }
    );
    assert_eq!(buf, before);
}

#[test]
fn every_traversal_is_a_permutation_of_odd_sizes() {
    for traversal in [
        Traversal::Hilbert,
        Traversal::Gilbert,
        Traversal::Rows,
        Traversal::Columns,
        Traversal::HorizontalLines,
        Traversal::VerticalLines,
        Traversal::Diagonal(70),
        Traversal::Rays,
        Traversal::Circles,
        Traversal::Spiral,
        Traversal::SquareSpiral,
        Traversal::RectSpiral,
    ] {
        for (w, h) in [(1, 1), (5, 3), (3, 7), (17, 9)] {
            let order = CurveOrder::build(traversal, w, h, None).unwrap();
            assert_eq!(order.len(), w * h);
            assert!(is_permutation(order.positions()), "{traversal} {w}x{h}");
        }
    }
}

#[test]
fn multi_pass_pipeline_preserves_the_multiset() {
    let mut buf = noise(23, 11);
    let before = sorted(&buf);
    Pipeline::new()
        .with_pass(Pass::new(ReorderConfig::new().with_segment_length(16)))
        .with_pass(
            Pass::new(
                ReorderConfig::new()
                    .with_threshold(SortKey::Luminance, 60, 190)
                    .with_key(SortKey::Saturation),
            )
            .with_traversal(Traversal::Gilbert)
            .with_reverse(true),
        )
        .with_pass(
            Pass::new(
                ReorderConfig::new()
                    .with_full_lines()
                    .with_algorithm(SortAlgorithm::Glitch),
            )
            .with_traversal(Traversal::VerticalLines),
        )
        .with_pass(
            Pass::new(
                ReorderConfig::new()
                    .with_random_spans(12)
                    .with_seed(4)
                    .with_algorithm(SortAlgorithm::Comb),
            )
            .with_traversal(Traversal::Circles),
        )
        .run(&mut buf)
        .unwrap();
    assert_eq!(sorted(&buf), before);
}

#[test]
fn remap_runs_are_reproducible() {
    let input = ppm_bytes(&noise(9, 6));
    let pipeline = Pipeline::single(Pass::new(
        ReorderConfig::new().with_mode(ReorderMode::Remap),
    ));
    let first = pipeline.process_ppm(&input).unwrap();
    let second = pipeline.process_ppm(&input).unwrap();
    assert_eq!(first, second);
    assert_ne!(first, input);
}

#[test]
fn preset_round_trips_through_ppm() {
    let original = noise(32, 20);
    let out = Pipeline::hilbert_glitch(0)
        .process_ppm(&ppm_bytes(&original))
        .unwrap();
    let decoded = ppm::decode(&out, &ResourceLimits::none()).unwrap();
    assert_eq!(decoded.max_value, 255);
    assert!(decoded.pixels.same_dimensions(&original));
    assert_eq!(sorted(&decoded.pixels), sorted(&original));
}

#[test]
fn bad_input_is_reported_not_panicked() {
    let pipeline = Pipeline::hilbert_glitch(0);
    assert!(matches!(
        pipeline.process_ppm(b"P5\n1 1\n255\n\0"),
        Err(GlitchError::Decode(DecodeError::InvalidHeader(_)))
    ));
    assert_eq!(
        pipeline.process_ppm(b"P6\n2 2\n255\n\x01\x02\x03"),
        Err(GlitchError::Decode(DecodeError::Truncated {
            expected: 12,
            actual: 3
        }))
    );
    let limited = pipeline.with_limits(ResourceLimits::none().with_max_width(8));
    assert!(matches!(
        limited.process_ppm(&ppm_bytes(&noise(9, 2))),
        Err(GlitchError::Limit(_))
    ));
    // Dimensions whose raster size overflows are rejected, not multiplied.
    assert_eq!(
        Pipeline::hilbert_glitch(0).process_ppm(b"P6\n4294967295 4294967295\n255\n"),
        Err(GlitchError::Decode(DecodeError::InvalidHeader(
            "dimensions overflow"
        )))
    );
}
