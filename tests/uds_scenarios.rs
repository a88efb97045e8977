//! End-to-end scenarios exercising the full session -> isotp -> odx
//! pipeline against a [LoopbackBus], matching the worked examples the
//! decoder and session layer are specified against.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use uds_isotp::config::{IsoTpConfig, UdsConfig};
use uds_isotp::isotp::frame;
use uds_isotp::isotp::IsoTpLink;
use uds_isotp::loopback::LoopbackBus;
use uds_isotp::odx::decode::{DecodeOutcome, DecodedValue};
use uds_isotp::odx::{BaseDataType, DiagCodedType, Param, PosResponseBuilder, ServiceBuilder, Termination};
use uds_isotp::uds::UdsSession;

fn session() -> (UdsSession, LoopbackBus) {
    let bus = LoopbackBus::new();
    let bus_for_link = bus.clone();
    let link = IsoTpLink::new(Arc::new(Mutex::new(bus_for_link)), IsoTpConfig::default()).unwrap();
    (UdsSession::new(link, UdsConfig::default()), bus)
}

/// Replies with `response`, segmenting into SF or FF/CF as needed, from a
/// background thread, so the session's blocking `receive` has something to
/// wait on. Consecutive frames are injected without waiting on the
/// receiver's own flow-control frame - the script already knows there's
/// exactly one block to send.
fn reply_with(bus: LoopbackBus, response: Vec<u8>) {
    let cfg = IsoTpConfig::default();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(5));
        if response.len() <= frame::single_frame_threshold(&cfg) {
            let sf = frame::make_single_frame(&response, &cfg).unwrap();
            bus.inject(0x7E8, &sf);
            return;
        }
        let (ff, mut sent) = frame::make_first_frame(&response, response.len(), &cfg);
        bus.inject(0x7E8, &ff);
        std::thread::sleep(Duration::from_millis(5));
        let mut seq = 1u8;
        let chunk_size = frame::max_pdu_length(&cfg);
        while sent < response.len() {
            let end = (sent + chunk_size).min(response.len());
            let cf = frame::make_consecutive_frame(&response[sent..end], seq, &cfg);
            bus.inject(0x7E8, &cf);
            sent = end;
            seq = if seq == 15 { 0 } else { seq + 1 };
            std::thread::sleep(Duration::from_millis(2));
        }
    });
}

#[test]
fn scenario_1_single_frame_rdbi() {
    let (uds, bus) = session();
    let service = ServiceBuilder::new("ReadDataByIdentifier", 0x22)
        .positive_response(
            PosResponseBuilder::new(0x62, 0xF18C)
                .param(Param::new(
                    "ECU_Serial_Number",
                    DiagCodedType::StandardLength { byte_length: 16 },
                    BaseDataType::AsciiString,
                ))
                .build(),
        )
        .build();

    let mut response = vec![0x62, 0xF1, 0x8C];
    response.extend_from_slice(b"ABC0011223344556");
    reply_with(bus, response);

    let outcome = uds.read_data_by_identifier(&service, &[0xF18C]).unwrap();
    match outcome {
        DecodeOutcome::Positive(dids) => {
            assert_eq!(
                dids[0].get("ECU_Serial_Number"),
                Some(&DecodedValue::Ascii("ABC0011223344556".to_string()))
            );
        }
        other => panic!("expected positive, got {:?}", other),
    }
}

#[test]
fn scenario_2_minmax_zero_termination() {
    let (uds, bus) = session();
    let service = ServiceBuilder::new("ReadDataByIdentifier", 0x22)
        .positive_response(
            PosResponseBuilder::new(0x62, 0x0294)
                .param(Param::new(
                    "PartNumber",
                    DiagCodedType::MinMaxLength { min_length: 1, max_length: Some(15), termination: Termination::Zero },
                    BaseDataType::AsciiString,
                ))
                .build(),
        )
        .build();

    let mut response = vec![0x62, 0x02, 0x94];
    response.extend_from_slice(b"ABC0011223344");
    response.push(0x00);
    reply_with(bus, response);

    let outcome = uds.read_data_by_identifier(&service, &[0x0294]).unwrap();
    match outcome {
        DecodeOutcome::Positive(dids) => {
            assert_eq!(dids[0].get("PartNumber"), Some(&DecodedValue::Ascii("ABC0011223344".to_string())));
        }
        other => panic!("expected positive, got {:?}", other),
    }
}

#[test]
fn scenario_3_minmax_end_of_pdu_no_terminator() {
    let (uds, bus) = session();
    let service = ServiceBuilder::new("ReadDataByIdentifier", 0x22)
        .positive_response(
            PosResponseBuilder::new(0x62, 0x0294)
                .param(Param::new(
                    "PartNumber",
                    DiagCodedType::MinMaxLength { min_length: 1, max_length: None, termination: Termination::EndOfPdu },
                    BaseDataType::AsciiString,
                ))
                .build(),
        )
        .build();

    let mut response = vec![0x62, 0x02, 0x94];
    response.extend_from_slice(b"ABC0011223344");
    reply_with(bus, response);

    let outcome = uds.read_data_by_identifier(&service, &[0x0294]).unwrap();
    match outcome {
        DecodeOutcome::Positive(dids) => {
            assert_eq!(dids[0].get("PartNumber"), Some(&DecodedValue::Ascii("ABC0011223344".to_string())));
        }
        other => panic!("expected positive, got {:?}", other),
    }
}

#[test]
fn scenario_4_mixed_type_single_did() {
    let (uds, bus) = session();
    let service = ServiceBuilder::new("ReadDataByIdentifier", 0x22)
        .positive_response(
            PosResponseBuilder::new(0x62, 0xF180)
                .param(Param::new("numberOfModules", DiagCodedType::StandardLength { byte_length: 1 }, BaseDataType::Uint32))
                .param(Param::new(
                    "Boot_Software_Identification",
                    DiagCodedType::StandardLength { byte_length: 24 },
                    BaseDataType::AsciiString,
                ))
                .build(),
        )
        .build();

    let mut response = vec![0x62, 0xF1, 0x80, 0x01];
    response.extend_from_slice(b"SwId12345678901234567890");
    reply_with(bus, response);

    let outcome = uds.read_data_by_identifier(&service, &[0xF180]).unwrap();
    match outcome {
        DecodeOutcome::Positive(dids) => {
            assert_eq!(dids[0].get("numberOfModules"), Some(&DecodedValue::Raw(vec![0x01])));
            assert_eq!(
                dids[0].get("Boot_Software_Identification"),
                Some(&DecodedValue::Ascii("SwId12345678901234567890".to_string()))
            );
        }
        other => panic!("expected positive, got {:?}", other),
    }
}

#[test]
fn scenario_5_negative_response_is_a_value_not_an_error() {
    let (uds, bus) = session();
    let service = ServiceBuilder::new("ReadDataByIdentifier", 0x22)
        .positive_response(
            PosResponseBuilder::new(0x62, 0xF18C)
                .param(Param::new("X", DiagCodedType::StandardLength { byte_length: 1 }, BaseDataType::Uint32))
                .build(),
        )
        .build();

    reply_with(bus, vec![0x7F, 0x22, 0x13]);

    let outcome = uds.read_data_by_identifier(&service, &[0xF18C]).unwrap();
    match outcome {
        DecodeOutcome::Negative { nrc, label } => {
            assert_eq!(nrc, 0x13);
            assert_eq!(label, None);
        }
        other => panic!("expected negative, got {:?}", other),
    }
}

#[test]
fn scenario_7_response_pending_retried_twice_then_positive() {
    let (uds, bus) = session();
    let service = ServiceBuilder::new("ReadDataByIdentifier", 0x22)
        .positive_response(
            PosResponseBuilder::new(0x62, 0xF18C)
                .param(Param::new(
                    "ECU_Serial_Number",
                    DiagCodedType::StandardLength { byte_length: 3 },
                    BaseDataType::AsciiString,
                ))
                .build(),
        )
        .build();

    let bus_thread = bus.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(5));
        bus_thread.inject(0x7E8, &[0x03, 0x7F, 0x22, 0x78, 0, 0, 0, 0]);
        std::thread::sleep(Duration::from_millis(5));
        bus_thread.inject(0x7E8, &[0x03, 0x7F, 0x22, 0x78, 0, 0, 0, 0]);
        std::thread::sleep(Duration::from_millis(5));
        bus_thread.inject(0x7E8, &[0x06, 0x62, 0xF1, 0x8C, b'A', b'B', b'C', 0]);
    });

    let outcome = uds.read_data_by_identifier(&service, &[0xF18C]).unwrap();
    match outcome {
        DecodeOutcome::Positive(dids) => {
            assert_eq!(dids[0].get("ECU_Serial_Number"), Some(&DecodedValue::Ascii("ABC".to_string())));
        }
        other => panic!("expected positive, got {:?}", other),
    }
    assert_eq!(uds.last_exchange_stats().pending_count, 2);
}
