//! Reader integration tests.
//!
//! Tests verify:
//! - The IFD chain is walked in order with two reads per directory
//! - TIFF and BigTIFF, little- and big-endian files parse the same way
//! - Invalid headers, cycles and over-long chains are rejected
//! - Out-of-line tag values are fetched lazily and only once

use std::io::Write;

use async_cog::error::{CogError, TiffError};
use async_cog::{CogReader, FileRangeReader, ReaderOptions, TagValue};

use super::test_utils::{
    create_pyramid, is_tiff_magic, ByteOrderType, IfdBuilder, TiffBuilder, TrackingMockReader,
    Value,
};

// =============================================================================
// Chain Walking
// =============================================================================

#[tokio::test]
async fn test_open_walks_full_chain() {
    let (data, offsets) = create_pyramid(ByteOrderType::LittleEndian, false);
    assert!(is_tiff_magic(&data));

    let reader = TrackingMockReader::new(data, "mock://pyramid.tif");
    let cog = CogReader::open(reader.clone()).await.unwrap();

    assert_eq!(cog.ifd_count(), 5);
    assert_eq!(offsets[0], 8);
    assert_eq!(cog.header().first_ifd_offset, 8);

    let found: Vec<u64> = cog.ifds().iter().map(|ifd| ifd.offset()).collect();
    assert_eq!(found, offsets);

    for pair in cog.ifds().windows(2) {
        assert_eq!(pair[0].next_ifd_offset(), pair[1].offset());
    }
    assert!(cog.ifds()[4].is_last());

    // Two header reads, then count + table per IFD
    assert_eq!(reader.request_count(), 2 + 2 * 5);
}

#[tokio::test]
async fn test_chain_at_fixed_offsets() {
    let chain = [8u64, 4282, 4542, 4802, 5062];
    let mut data = vec![0u8; 5100];
    data[0..8].copy_from_slice(b"II\x2A\x00\x08\x00\x00\x00");

    for (i, &offset) in chain.iter().enumerate() {
        let next = chain.get(i + 1).copied().unwrap_or(0) as u32;
        let at = offset as usize;
        // One SHORT ImageWidth entry, then the next pointer
        data[at..at + 2].copy_from_slice(&1u16.to_le_bytes());
        data[at + 2..at + 4].copy_from_slice(&256u16.to_le_bytes());
        data[at + 4..at + 6].copy_from_slice(&3u16.to_le_bytes());
        data[at + 6..at + 10].copy_from_slice(&1u32.to_le_bytes());
        data[at + 10..at + 12].copy_from_slice(&(512u16 >> i).to_le_bytes());
        data[at + 14..at + 18].copy_from_slice(&next.to_le_bytes());
    }

    let cog = CogReader::open(TrackingMockReader::new(data, "mock://chain"))
        .await
        .unwrap();

    let found: Vec<u64> = cog.ifds().iter().map(|ifd| ifd.offset()).collect();
    assert_eq!(found, chain);
    assert_eq!(cog.ifds()[4].next_ifd_offset(), 0);
    assert_eq!(
        cog.ifds()[2].lookup("ImageWidth").unwrap().as_u64(),
        Some(128)
    );
}

#[tokio::test]
async fn test_open_read_pattern() {
    let (data, offsets) = create_pyramid(ByteOrderType::LittleEndian, false);
    let reader = TrackingMockReader::new(data, "mock://pyramid.tif");
    let cog = CogReader::open(reader.clone()).await.unwrap();

    let requests = reader.get_requests().await;
    assert_eq!(requests[0], (0, 4));
    assert_eq!(requests[1], (4, 4));

    let first = &cog.ifds()[0];
    assert_eq!(requests[2], (offsets[0], 2));
    assert_eq!(
        requests[3],
        (offsets[0] + 2, first.tag_count() as usize * 12 + 4)
    );
}

#[tokio::test]
async fn test_bigtiff_chain() {
    let (data, offsets) = create_pyramid(ByteOrderType::LittleEndian, true);
    assert_eq!(&data[0..4], &[b'I', b'I', 43, 0]);

    let reader = TrackingMockReader::new(data, "mock://big.tif");
    let mut cog = CogReader::open(reader.clone()).await.unwrap();

    assert!(cog.is_big_tiff());
    assert_eq!(cog.header().first_ifd_offset, 16);
    assert_eq!(cog.ifd_count(), 5);
    assert_eq!(cog.ifds()[1].offset(), offsets[1]);

    // BigTIFF header is 4 + 12 bytes
    let requests = reader.get_requests().await;
    assert_eq!(requests[1], (4, 12));
    assert_eq!(requests[2], (16, 8));

    let ifd = cog.load_ifd(0).await.unwrap();
    assert_eq!(ifd.lookup("ImageWidth").unwrap().as_u64(), Some(512));
    assert_eq!(
        ifd.lookup("TileOffsets").unwrap().to_u64_vec().map(|v| v.len()),
        Some(4)
    );
}

#[tokio::test]
async fn test_big_endian_ascii() {
    let data = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_ifd(
            IfdBuilder::tiled(64, 64, 64, 64, 1)
                .ascii(305, "test")
                .ascii(270, "a longer image description"),
        )
        .build();
    assert_eq!(&data[0..4], b"MM\x00\x2A");

    let reader = TrackingMockReader::new(data, "mock://be.tif");
    let mut cog = CogReader::open(reader).await.unwrap();
    assert_eq!(cog.byte_order().name(), "big-endian");

    // "test\0" needs five bytes, so it lives out of line
    let software = cog.ifd(0).unwrap().tag("Software").unwrap();
    assert!(!software.is_inline());
    assert!(software.value().is_none());

    let ifd = cog.load_ifd(0).await.unwrap();
    assert_eq!(ifd.lookup("Software").unwrap().as_str(), Some("test"));
    assert_eq!(
        ifd.lookup("ImageDescription").unwrap().as_str(),
        Some("a longer image description")
    );
    assert_eq!(ifd.lookup("ImageWidth").unwrap().as_u64(), Some(64));
}

#[tokio::test]
async fn test_byte_orders_produce_equivalent_mappings() {
    let mut mappings = Vec::new();
    for (order, big) in [
        (ByteOrderType::LittleEndian, false),
        (ByteOrderType::BigEndian, false),
        (ByteOrderType::LittleEndian, true),
        (ByteOrderType::BigEndian, true),
    ] {
        let (data, _) = create_pyramid(order, big);
        let mut cog = CogReader::open(TrackingMockReader::new(data, "mock://p.tif"))
            .await
            .unwrap();
        cog.load_all().await.unwrap();

        let mut mapping = cog.ifds()[0].to_mapping();
        // Offsets differ between layouts
        mapping.remove("TileOffsets");
        mappings.push(serde_json::to_value(&mapping).unwrap());
    }

    for other in &mappings[1..] {
        assert_eq!(&mappings[0], other);
    }
}

// =============================================================================
// Rejected Files
// =============================================================================

#[tokio::test]
async fn test_invalid_header() {
    let reader = TrackingMockReader::new(b"XX\x2A\x00\x08\x00\x00\x00".to_vec(), "mock://bad");
    match CogReader::open(reader).await {
        Err(CogError::Tiff(e)) => assert!(e.is_invalid_format()),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("opened a file with bad magic"),
    }

    let mut bigtiff = b"II\x2B\x00\x04\x00\x00\x00".to_vec();
    bigtiff.extend_from_slice(&[0; 8]);
    let reader = TrackingMockReader::new(bigtiff, "mock://bad");
    assert!(matches!(
        CogReader::open(reader).await,
        Err(CogError::Tiff(TiffError::InvalidBigTiffOffsetSize(4)))
    ));
}

#[tokio::test]
async fn test_ifd_cycle() {
    let (mut data, offsets) = TiffBuilder::new()
        .add_ifd(IfdBuilder::new().short(256, &[1]))
        .add_ifd(IfdBuilder::new().short(256, &[2]))
        .build_with_offsets();

    // Second IFD points back to the first
    let pointer_pos = offsets[1] as usize + 2 + 12;
    data[pointer_pos..pointer_pos + 4].copy_from_slice(&(offsets[0] as u32).to_le_bytes());

    let result = CogReader::open(TrackingMockReader::new(data, "mock://cycle")).await;
    assert!(matches!(
        result,
        Err(CogError::Tiff(TiffError::IfdCycle(offset))) if offset == offsets[0]
    ));
}

#[tokio::test]
async fn test_max_ifds() {
    let (data, _) = create_pyramid(ByteOrderType::LittleEndian, false);

    let options = ReaderOptions { max_ifds: 3 };
    let result =
        CogReader::open_with_options(TrackingMockReader::new(data.clone(), "mock://p"), options)
            .await;
    assert!(matches!(
        result,
        Err(CogError::Tiff(TiffError::TooManyIfds(3)))
    ));

    let options = ReaderOptions { max_ifds: 5 };
    let cog = CogReader::open_with_options(TrackingMockReader::new(data, "mock://p"), options)
        .await
        .unwrap();
    assert_eq!(cog.ifd_count(), 5);
}

#[tokio::test]
async fn test_truncated_table() {
    let (data, offsets) = create_pyramid(ByteOrderType::LittleEndian, false);
    let cut = offsets[1] as usize + 10;

    let result = CogReader::open(TrackingMockReader::new(data[..cut].to_vec(), "mock://t")).await;
    assert!(matches!(result, Err(CogError::Tiff(TiffError::Io(_)))));
}

#[tokio::test]
async fn test_unknown_field_type_is_skipped() {
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::tiled(32, 32, 32, 32, 1).entry(
            40000,
            Value::Raw {
                field_type: 99,
                count: 1,
                payload: vec![0; 4],
            },
        ))
        .build();

    let cog = CogReader::open(TrackingMockReader::new(data, "mock://u"))
        .await
        .unwrap();
    let ifd = cog.ifd(0).unwrap();

    assert!(ifd.tag_by_code(40000).is_none());
    assert_eq!(ifd.tags().len(), 7);
    assert_eq!(ifd.tag_count(), 8);
}

// =============================================================================
// Lazy Loading
// =============================================================================

#[tokio::test]
async fn test_tags_load_once() {
    let (data, _) = create_pyramid(ByteOrderType::LittleEndian, false);
    let reader = TrackingMockReader::new(data, "mock://lazy");
    let mut cog = CogReader::open(reader.clone()).await.unwrap();

    let out_of_line = cog.ifds()[0]
        .tags()
        .iter()
        .filter(|tag| !tag.is_loaded())
        .count();
    assert!(out_of_line > 0);

    let before = reader.request_count();
    cog.load_ifd(0).await.unwrap();
    assert_eq!(reader.request_count(), before + out_of_line);

    cog.load_ifd(0).await.unwrap();
    assert_eq!(reader.request_count(), before + out_of_line);
}

#[tokio::test]
async fn test_inline_values_need_no_reads() {
    let (data, _) = create_pyramid(ByteOrderType::LittleEndian, false);
    let reader = TrackingMockReader::new(data, "mock://inline");
    let cog = CogReader::open(reader).await.unwrap();

    let ifd = &cog.ifds()[4];
    assert_eq!(ifd.lookup("ImageWidth").unwrap().as_u64(), Some(32));
    assert_eq!(ifd.lookup("Compression").unwrap().as_u64(), Some(1));
    assert!(matches!(
        ifd.lookup("TileOffsets").unwrap(),
        TagValue::Numbers(v) if v.len() == 1
    ));
    assert!(matches!(
        ifd.lookup("ModelPixelScaleTag"),
        Err(TiffError::TagNotFound(_))
    ));
}

#[tokio::test]
async fn test_unloaded_lookup_fails() {
    let (data, _) = create_pyramid(ByteOrderType::LittleEndian, false);
    let cog = CogReader::open(TrackingMockReader::new(data, "mock://unloaded"))
        .await
        .unwrap();

    let ifd = &cog.ifds()[0];
    assert!(ifd.contains("ModelTiepointTag"));
    assert!(matches!(
        ifd.lookup("ModelTiepointTag"),
        Err(TiffError::TagNotLoaded(_))
    ));
}

// =============================================================================
// Local Files
// =============================================================================

#[tokio::test]
async fn test_file_reader() {
    let (data, _) = create_pyramid(ByteOrderType::BigEndian, false);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let reader = FileRangeReader::new(file.path()).await.unwrap();
    let mut cog = CogReader::open(reader).await.unwrap();
    assert_eq!(cog.ifd_count(), 5);

    let tile = cog.read_tile(0, 1, 1).await.unwrap();
    assert_eq!(tile.len(), 256 * 256);
    assert!(tile.iter().all(|&b| b == 3));

    cog.close();
}
