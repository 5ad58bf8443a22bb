//! End-to-end bank processing against synthetic NeXus files.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use hdf5::types::VarLenUnicode;
use hdf5::{File, Group};
use nexhist_core::{linear_edges, PulseRoi};
use nexhist_reduce::{process_file, BankProcessor, CalibrationInput, ReduceConfig, SplitTarget};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tempfile::NamedTempFile;

fn set_str_attr(group: &Group, name: &str, value: &str) {
    let value = VarLenUnicode::from_str(value).unwrap();
    group
        .new_attr::<VarLenUnicode>()
        .create(name)
        .unwrap()
        .write_scalar(&value)
        .unwrap();
}

fn write_bank(
    entry: &Group,
    name: &str,
    detids: &[u32],
    tofs: &[f32],
    event_index: &[u64],
    units: Option<&str>,
) {
    let bank = entry.create_group(name).unwrap();
    set_str_attr(&bank, "NX_class", "NXevent_data");
    bank.new_dataset_builder()
        .with_data(detids)
        .create("event_id")
        .unwrap();
    let tof = bank
        .new_dataset_builder()
        .with_data(tofs)
        .create("event_time_offset")
        .unwrap();
    if let Some(label) = units {
        let value = VarLenUnicode::from_str(label).unwrap();
        tof.new_attr::<VarLenUnicode>()
            .create("units")
            .unwrap()
            .write_scalar(&value)
            .unwrap();
    }
    bank.new_dataset_builder()
        .with_data(event_index)
        .create("event_index")
        .unwrap();
}

fn create_entry(file: &File) -> Group {
    let entry = file.create_group("entry").unwrap();
    set_str_attr(&entry, "NX_class", "NXentry");
    entry
}

fn identity_calibration(idmax: u32) -> HashMap<u32, f64> {
    (0..=idmax).map(|id| (id, 1.0)).collect()
}

#[test]
fn worked_example_histogram() {
    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        write_bank(
            &entry,
            "bank1_events",
            &[5, 5, 5],
            &[1.0, 15.0, 25.0],
            &[0],
            Some("microsecond"),
        );
    }

    let factors = identity_calibration(10);
    let masked = HashSet::new();
    let edges = vec![0.0, 10.0, 20.0, 30.0];
    let results = process_file(
        tmp.path(),
        &ReduceConfig::default(),
        CalibrationInput {
            factors: &factors,
            masked: &masked,
        },
        &edges,
    )
    .unwrap();

    assert_eq!(results["bank1_events"], vec![1, 1, 1]);
}

#[test]
fn chunk_size_does_not_change_histogram() {
    let n = 1000u32;
    let detids: Vec<u32> = (0..n).map(|i| i % 20).collect();
    let tofs: Vec<f32> = (0..n).map(|i| (i * 7 % 300) as f32 * 0.1).collect();

    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        write_bank(&entry, "bank7_events", &detids, &tofs, &[0], None);
    }

    let factors = identity_calibration(19);
    let masked = HashSet::new();
    let input = CalibrationInput {
        factors: &factors,
        masked: &masked,
    };
    let edges = linear_edges(0.0, 30.0, 30).unwrap();

    let reference = process_file(tmp.path(), &ReduceConfig::default(), input, &edges).unwrap();
    for events_per_chunk in [1, 7, 64, 999, 1000] {
        let config = ReduceConfig::default()
            .with_events_per_chunk(events_per_chunk)
            .with_grainsize_event(13);
        let results = process_file(tmp.path(), &config, input, &edges).unwrap();
        assert_eq!(
            results["bank7_events"], reference["bank7_events"],
            "chunk size {} diverged",
            events_per_chunk
        );
    }
}

#[test]
fn time_filter_selects_exactly_the_configured_ranges() {
    // 300 events; pulse boundaries every 50. Events carry their own
    // index as TOF so the selected windows are recognizable in the
    // histogram.
    let detids = vec![1u32; 300];
    let tofs: Vec<f32> = (0..300).map(|i| i as f32).collect();
    let event_index: Vec<u64> = (0..6).map(|i| i * 50).collect();

    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        write_bank(&entry, "bank2_events", &detids, &tofs, &event_index, None);
    }

    let factors = identity_calibration(1);
    let masked = HashSet::new();
    let config = ReduceConfig::default()
        .with_events_per_chunk(32)
        .with_time_filter(vec![PulseRoi::new(0, 1), PulseRoi::new(4, PulseRoi::TO_END)]);
    let edges = linear_edges(0.0, 300.0, 300).unwrap();

    let results = process_file(
        tmp.path(),
        &config,
        CalibrationInput {
            factors: &factors,
            masked: &masked,
        },
        &edges,
    )
    .unwrap();

    let counts = &results["bank2_events"];
    // Events 0..50 and 200..300 are selected, one per unit bin.
    let total: u32 = counts.iter().sum();
    assert_eq!(total, 150);
    for (bin, &count) in counts.iter().enumerate() {
        let selected = bin < 50 || bin >= 200;
        assert_eq!(count, u32::from(selected), "bin {}", bin);
    }
}

#[test]
fn nanosecond_units_fold_into_calibration() {
    // 1500 ns scales to 1.5 us and must land in the first bin.
    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        write_bank(
            &entry,
            "bank3_events",
            &[2, 2],
            &[1500.0, 25_000.0],
            &[0],
            Some("ns"),
        );
    }

    let factors = identity_calibration(2);
    let masked = HashSet::new();
    let edges = vec![0.0, 10.0, 20.0, 30.0];
    let results = process_file(
        tmp.path(),
        &ReduceConfig::default(),
        CalibrationInput {
            factors: &factors,
            masked: &masked,
        },
        &edges,
    )
    .unwrap();

    assert_eq!(results["bank3_events"], vec![1, 0, 1]);
}

#[test]
fn masked_and_unmapped_ids_are_dropped() {
    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        // id 1 calibrated, id 2 masked, id 9 absent from the map.
        write_bank(
            &entry,
            "bank4_events",
            &[1, 2, 9, 1],
            &[5.0, 5.0, 5.0, 15.0],
            &[0],
            None,
        );
    }

    let mut factors = HashMap::new();
    factors.insert(1u32, 1.0);
    factors.insert(2u32, 1.0);
    let masked: HashSet<u32> = [2].into_iter().collect();
    let edges = vec![0.0, 10.0, 20.0];
    let results = process_file(
        tmp.path(),
        &ReduceConfig::default(),
        CalibrationInput {
            factors: &factors,
            masked: &masked,
        },
        &edges,
    )
    .unwrap();

    assert_eq!(results["bank4_events"], vec![1, 1]);
}

#[test]
fn zero_event_bank_writes_nothing() {
    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        let empty_f32: Vec<f32> = Vec::new();
        let empty_u32: Vec<u32> = Vec::new();
        let empty_u64: Vec<u64> = Vec::new();
        write_bank(&entry, "bank5_events", &empty_u32, &empty_f32, &empty_u64, None);
    }

    let factors = identity_calibration(1);
    let masked = HashSet::new();
    let input = CalibrationInput {
        factors: &factors,
        masked: &masked,
    };
    let edges = vec![0.0, 10.0];
    let config = ReduceConfig::default();

    let file = nexhist_io::NexusFile::open(tmp.path()).unwrap();
    let bank = file.bank("bank5_events").unwrap();
    let processor = BankProcessor::new(&config, input, &edges);

    // Pre-poisoned output must come back untouched: an empty bank makes
    // no histogram writes at all.
    let mut out = vec![77u32];
    processor.process_bank(&bank, "bank5_events", &mut out).unwrap();
    assert_eq!(out, vec![77]);
}

#[test]
fn split_targets_route_ranges_to_their_outputs() {
    // 100 events over 4 pulses of 25; all TOF = 5.0 so every selected
    // event lands in bin 0.
    let detids = vec![1u32; 100];
    let tofs = vec![5.0f32; 100];
    let event_index: Vec<u64> = vec![0, 25, 50, 75];

    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        write_bank(&entry, "bank6_events", &detids, &tofs, &event_index, None);
    }

    let factors = identity_calibration(1);
    let masked = HashSet::new();
    let config = ReduceConfig::default().with_events_per_chunk(16);
    let edges = vec![0.0, 10.0];
    let processor = BankProcessor::new(
        &config,
        CalibrationInput {
            factors: &factors,
            masked: &masked,
        },
        &edges,
    );

    let file = nexhist_io::NexusFile::open(tmp.path()).unwrap();
    let bank = file.bank("bank6_events").unwrap();

    let targets = vec![
        SplitTarget {
            target: 0,
            rois: vec![PulseRoi::new(0, 1)],
        },
        SplitTarget {
            target: 1,
            rois: vec![PulseRoi::new(2, PulseRoi::TO_END)],
        },
    ];
    let mut outputs = vec![vec![0u32], vec![0u32]];
    processor
        .process_bank_split(&bank, "bank6_events", &targets, &mut outputs)
        .unwrap();

    assert_eq!(outputs[0], vec![25]); // pulse 0
    assert_eq!(outputs[1], vec![50]); // pulses 2..end
}

#[test]
fn missing_dataset_aborts_the_bank() {
    let tmp = NamedTempFile::new().unwrap();
    {
        let file = File::create(tmp.path()).unwrap();
        let entry = create_entry(&file);
        // TOF present, detector ids missing.
        let bank = entry.create_group("broken_events").unwrap();
        set_str_attr(&bank, "NX_class", "NXevent_data");
        bank.new_dataset_builder()
            .with_data(&[1.0f32, 2.0])
            .create("event_time_offset")
            .unwrap();
    }

    let factors = identity_calibration(1);
    let masked = HashSet::new();
    let config = ReduceConfig::default();
    let edges = vec![0.0, 10.0];
    let processor = BankProcessor::new(
        &config,
        CalibrationInput {
            factors: &factors,
            masked: &masked,
        },
        &edges,
    );

    let file = nexhist_io::NexusFile::open(tmp.path()).unwrap();
    let bank = file.bank("broken_events").unwrap();

    let mut out = vec![3u32];
    let err = processor.process_bank(&bank, "broken_events", &mut out);
    assert!(err.is_err());
    // No partial spectrum is published for a failed bank.
    assert_eq!(out, vec![3]);
}
