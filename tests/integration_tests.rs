use hexreclib::{
    AnyFile, FormatKind, HexRecError, IhexFile, ImageErrorKind, RecordErrorKind, SparseImage,
    SrecFile, TiTxtFile,
};

#[test]
fn test_ihex_parse_end_to_end() {
    // Arrange
    let bytes = b":0B0010006164647265737320676170A7\r\n:00000001FF\r\n";

    // Act
    let mut file = IhexFile::parse(bytes).unwrap();

    // Assert: one data record and one EOF, mapping 0x10..0x1B
    let records = file.records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].address, 0x0010);
    assert_eq!(records[0].data, b"address gap".to_vec());
    assert_eq!(records[0].checksum, Some(0xA7));
    assert_eq!(
        file.image().to_blocks(),
        vec![(0x0010, b"address gap".to_vec())]
    );
}

#[test]
fn test_srec_chain_end_to_end() {
    // Arrange
    let bytes = b"S0030000FC\r\nS1080000010203040AE3\r\nS5030001FB\r\nS9030000FC\r\n";

    // Act
    let mut file = SrecFile::parse(bytes).unwrap();

    // Assert
    assert_eq!(file.header(), Some(Vec::new()));
    assert_eq!(file.start_address(), Some(0));
    assert_eq!(
        file.image().to_blocks(),
        vec![(0, vec![0x01, 0x02, 0x03, 0x04, 0x0A])]
    );
    assert!(file.validate().is_ok());
}

#[test]
fn test_titxt_merge_end_to_end() {
    // Arrange
    let mut first = TiTxtFile::parse(b"@F000\nAA BB\nq\n").unwrap();
    let mut second = TiTxtFile::parse(b"@F002\nCC DD\nq\n").unwrap();

    // Act
    first.merge(&mut second).unwrap();

    // Assert
    assert_eq!(
        first.image().to_blocks(),
        vec![(0xF000, vec![0xAA, 0xBB, 0xCC, 0xDD])]
    );
    assert_eq!(first.to_bytes().unwrap(), b"@F000\nAA BB CC DD\nq\n".to_vec());
}

#[test]
fn test_crop_then_fill() {
    // Arrange
    let mut file = SrecFile::from_bytes(b"hello", 0x1000);

    // Act
    file.crop(Some(0x1002), Some(0x1004)).unwrap();
    file.fill(Some(0x1002), Some(0x1004), &[0xFF]).unwrap();

    // Assert
    assert_eq!(
        file.image().to_blocks(),
        vec![(0x1002, vec![0xFF, 0xFF])]
    );
}

#[test]
fn test_bounded_write_fails_without_mutation() {
    // Arrange
    let mut image = SparseImage::new();
    image.set_bounds(Some(0x8000), Some(0x1_0000)).unwrap();

    // Act
    let result = image.write(0xFFFE, b"ABCD");

    // Assert
    assert!(matches!(
        result,
        Err(ImageErrorKind::OutOfBounds { .. })
    ));
    assert!(image.is_empty());
}

#[test]
fn test_cross_format_convert_round_trip() {
    // Arrange
    let blocks = [(0x100_u64, b"lorem".to_vec()), (0x2000, b"ipsum".to_vec())];
    let source = AnyFile::from_image(FormatKind::Ihex, SparseImage::from_blocks(blocks.clone()));

    // Act: ihex -> srec -> titxt -> mos -> xtek -> asciihex -> ihex
    let mut file = source;
    for kind in [
        FormatKind::Srec,
        FormatKind::TiTxt,
        FormatKind::Mos,
        FormatKind::Xtek,
        FormatKind::AsciiHex,
        FormatKind::Ihex,
    ] {
        let bytes = file.convert(kind).to_bytes().unwrap();
        file = AnyFile::parse(kind, &bytes).unwrap();
    }

    // Assert: the image survives every conversion as a mapping
    assert_eq!(file.image().to_blocks(), blocks.to_vec());
}

#[test]
fn test_convert_preserves_start_address() {
    // Arrange
    let mut ihex = AnyFile::parse(
        FormatKind::Ihex,
        b":0100100041AE\r\n:040000050000CAFE2F\r\n:00000001FF\r\n",
    )
    .unwrap();

    // Act
    let mut srec = ihex.convert(FormatKind::Srec);
    let bytes = srec.to_bytes().unwrap();
    let mut parsed = AnyFile::parse(FormatKind::Srec, &bytes).unwrap();

    // Assert
    assert_eq!(parsed.start_address(), Some(0xCAFE));
}

#[test]
fn test_apply_update_round_trip_all_formats() {
    // Arrange: even sizes and addresses so the word-oriented format fits
    let blocks = [(0x10_u64, b"abcdef".to_vec()), (0x40, b"xy".to_vec())];

    for kind in [
        FormatKind::Ihex,
        FormatKind::Srec,
        FormatKind::TiTxt,
        FormatKind::Tek,
        FormatKind::Xtek,
        FormatKind::Mos,
        FormatKind::Avr,
        FormatKind::AsciiHex,
    ] {
        // Act
        let mut file = AnyFile::from_image(kind, SparseImage::from_blocks(blocks.clone()));
        let bytes = file.to_bytes().unwrap();
        let mut parsed = AnyFile::parse(kind, &bytes).unwrap();

        // Assert
        assert_eq!(
            parsed.image().to_blocks(),
            blocks.to_vec(),
            "format {}",
            kind.name()
        );
        assert!(parsed.validate().is_ok(), "format {}", kind.name());
    }
}

#[test]
fn test_shift_round_trip_is_identity() {
    // Arrange
    let mut file = SrecFile::from_blocks([(0x100_u64, b"data".to_vec())]);
    let original = file.image().to_blocks();

    // Act
    file.shift(0x1000).unwrap();
    file.shift(-0x1000).unwrap();

    // Assert
    assert_eq!(file.image().to_blocks(), original);
}

#[test]
fn test_fill_pattern_alignment() {
    // Arrange
    let mut image = SparseImage::new();
    let pattern = [0x11, 0x22, 0x33];

    // Act
    image.fill(7, 11, &pattern).unwrap();

    // Assert: pattern[0] at 7, pattern[1] at 8, pattern[2] at 9, pattern[0] at 10
    assert_eq!(image.peek(7), Some(0x11));
    assert_eq!(image.peek(8), Some(0x22));
    assert_eq!(image.peek(9), Some(0x33));
    assert_eq!(image.peek(10), Some(0x11));
}

#[test]
fn test_edit_marks_records_stale() {
    // Arrange
    let mut file = IhexFile::parse(b":0100100041AE\r\n:00000001FF\r\n").unwrap();
    assert_eq!(file.records().unwrap().len(), 2);

    // Act: editing memory regenerates records on next access
    file.write(0x4000, &[0x55; 20]).unwrap();

    // Assert
    let records = file.records().unwrap();
    let data_records = records
        .iter()
        .filter(|record| !record.data.is_empty() && record.address != 0)
        .count();
    assert!(data_records >= 2);
    let bytes = file.to_bytes().unwrap();
    let mut parsed = IhexFile::parse(&bytes).unwrap();
    assert_eq!(
        parsed.image().to_blocks(),
        vec![(0x10, vec![0x41]), (0x4000, vec![0x55; 20])]
    );
}

#[test]
fn test_ignore_errors_demotes_checksum_failures() {
    // Arrange: middle record carries a wrong checksum
    let bytes = b"S0030000FC\r\nS106007B61626300\r\nS9030000FC\r\n";
    let options = hexreclib::ParseOptions {
        ignore_errors: true,
        ..Default::default()
    };

    // Act
    let file = SrecFile::parse_with(bytes, &options).unwrap();

    // Assert
    assert_eq!(file.warnings().len(), 1);
    assert!(matches!(
        file.warnings()[0],
        HexRecError::Parse(RecordErrorKind::ChecksumMismatch { .. }, 2)
    ));
}

#[test]
fn test_load_guess_and_sniff() {
    // Arrange
    let dir = std::env::temp_dir().join("hexreclib_it");
    std::fs::create_dir_all(&dir).unwrap();
    let hex_path = dir.join("image.hex");
    let odd_path = dir.join("image.weird");
    let payload = b":0100100041AE\r\n:00000001FF\r\n";
    std::fs::write(&hex_path, payload).unwrap();
    std::fs::write(&odd_path, payload).unwrap();

    // Act: extension guess, then content sniff fallback
    let mut by_ext = hexreclib::load(&hex_path, None).unwrap();
    let mut by_sniff = hexreclib::load(&odd_path, None).unwrap();

    // Assert
    assert_eq!(by_ext.format_kind(), FormatKind::Ihex);
    assert_eq!(by_sniff.format_kind(), FormatKind::Ihex);
    assert_eq!(by_ext.image().to_blocks(), by_sniff.image().to_blocks());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_facade_convert_and_merge() {
    // Arrange
    let dir = std::env::temp_dir().join("hexreclib_it_facade");
    std::fs::create_dir_all(&dir).unwrap();
    let a_path = dir.join("a.txt");
    let b_path = dir.join("b.txt");
    let out_path = dir.join("merged.hex");
    std::fs::write(&a_path, b"@F000\nAA BB\nq\n").unwrap();
    std::fs::write(&b_path, b"@F002\nCC DD\nq\n").unwrap();

    // Act
    let mut merged = hexreclib::merge(&[&a_path, &b_path], &out_path, None).unwrap();

    // Assert
    assert_eq!(merged.format_kind(), FormatKind::Ihex);
    assert_eq!(
        merged.image().to_blocks(),
        vec![(0xF000, vec![0xAA, 0xBB, 0xCC, 0xDD])]
    );
    let mut reloaded = hexreclib::load(&out_path, None).unwrap();
    assert_eq!(
        reloaded.image().to_blocks(),
        vec![(0xF000, vec![0xAA, 0xBB, 0xCC, 0xDD])]
    );

    std::fs::remove_dir_all(&dir).ok();
}
