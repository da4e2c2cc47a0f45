use crc_any::CRCu16;
use mavdialect::{
    compile, CompileError, CompileOptions, ConflictKind, MavType, MergePolicy, MergedDialect,
    Value, XmlSource,
};

fn compile_one(xml: &str) -> MergedDialect {
    compile(
        &[XmlSource::new("test.xml", xml)],
        &CompileOptions::default(),
    )
    .expect("dialect should compile")
}

fn seed_of(parts: &[&[u8]]) -> u8 {
    let mut crc = CRCu16::crc16mcrf4cc();
    for part in parts {
        crc.digest(part);
    }
    let value = crc.get_crc();
    ((value & 0xff) ^ (value >> 8)) as u8
}

#[test]
fn empty_message_compiles_to_empty_layout() {
    let table = compile_one(
        r#"<mavlink><messages><message id="1" name="PING"/></messages></mavlink>"#,
    );
    let msg = &table.messages_by_name["ping"];
    assert_eq!(msg.id, 1);
    assert_eq!(msg.payload_size, 0);
    assert_eq!(msg.extension_payload_size, 0);
    assert!(msg.fields.is_empty());
    assert!(msg.extension_fields.is_empty());
    assert!(msg.default_msg.is_empty());
    assert_eq!(msg.crc_extra, seed_of(&[b"PING "]));
}

#[test]
fn single_field_seed_digests_type_and_name() {
    let table = compile_one(
        r#"<mavlink>
             <messages>
               <message id="0" name="HEARTBEAT">
                 <field name="type" type="uint8_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let msg = &table.messages_by_name["heartbeat"];
    assert_eq!(msg.payload_size, 1);
    assert_eq!(msg.crc_extra, seed_of(&[b"HEARTBEAT uint8_t type "]));
}

#[test]
fn regular_fields_reorder_by_wire_priority() {
    let table = compile_one(
        r#"<mavlink>
             <messages>
               <message id="9" name="MIXED">
                 <field name="a" type="uint8_t"/>
                 <field name="b" type="uint32_t"/>
                 <field name="c" type="uint16_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let msg = &table.messages_by_name["mixed"];
    let order: Vec<&str> = msg.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(order, ["b", "c", "a"]);
    assert_eq!(msg.payload_size, 7);
}

#[test]
fn array_length_digests_as_a_raw_byte() {
    let table = compile_one(
        r#"<mavlink>
             <messages>
               <message id="3" name="NAV">
                 <field name="wp" type="float[4]"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let msg = &table.messages_by_name["nav"];
    assert_eq!(msg.payload_size, 16);
    assert_eq!(
        msg.default_msg["wp"],
        Value::Array(vec![Value::Float(0.0); 4])
    );
    assert_eq!(msg.crc_extra, seed_of(&[b"NAV float wp ", &[4u8]]));
}

#[test]
fn extension_fields_split_off_and_never_reach_the_seed() {
    let base = compile_one(
        r#"<mavlink>
             <messages>
               <message id="5" name="M">
                 <field name="a" type="uint8_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let extended = compile_one(
        r#"<mavlink>
             <messages>
               <message id="5" name="M">
                 <field name="a" type="uint8_t"/>
                 <extensions/>
                 <field name="b" type="uint16_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let base = &base.messages_by_name["m"];
    let extended = &extended.messages_by_name["m"];

    let regular: Vec<&str> = extended.fields.iter().map(|f| f.name.as_str()).collect();
    let extension: Vec<&str> = extended
        .extension_fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(regular, ["a"]);
    assert_eq!(extension, ["b"]);
    assert_eq!(extended.payload_size, 1);
    assert_eq!(extended.extension_payload_size, 3);
    assert_eq!(extended.crc_extra, base.crc_extra);
}

#[test]
fn seed_ignores_descriptions_and_enum_bindings() {
    let plain = compile_one(
        r#"<mavlink>
             <messages>
               <message id="6" name="MODED">
                 <field name="mode" type="uint8_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let adorned = compile_one(
        r#"<mavlink>
             <enums>
               <enum name="MODES">
                 <entry value="1" name="FOO"/>
               </enum>
             </enums>
             <messages>
               <message id="6" name="MODED">
                 <description>A mode report.</description>
                 <field name="mode" type="uint8_t" enum="MODES">the mode</field>
               </message>
             </messages>
           </mavlink>"#,
    );
    assert_eq!(
        plain.messages_by_name["moded"].crc_extra,
        adorned.messages_by_name["moded"].crc_extra,
    );
}

#[test]
fn version_pseudo_type_keeps_identity_but_digests_as_uint8() {
    let versioned = compile_one(
        r#"<mavlink>
             <messages>
               <message id="8" name="V">
                 <field name="v" type="uint8_t_mavlink_version"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let plain = compile_one(
        r#"<mavlink>
             <messages>
               <message id="8" name="V">
                 <field name="v" type="uint8_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );
    let versioned = &versioned.messages_by_name["v"];
    assert_eq!(versioned.fields[0].typ, MavType::UInt8MavlinkVersion);
    assert_eq!(versioned.crc_extra, plain.messages_by_name["v"].crc_extra);
}

// The published MAVLink message_crcs table pins these two: HEARTBEAT is 50,
// PING is 237. Catches any drift in sorting, naming or digest order.
#[test]
fn real_world_crc_extras_match_published_values() {
    let table = compile_one(
        r#"<mavlink>
             <messages>
               <message id="0" name="HEARTBEAT">
                 <field name="type" type="uint8_t"/>
                 <field name="autopilot" type="uint8_t"/>
                 <field name="base_mode" type="uint8_t"/>
                 <field name="custom_mode" type="uint32_t"/>
                 <field name="system_status" type="uint8_t"/>
                 <field name="mavlink_version" type="uint8_t_mavlink_version"/>
               </message>
               <message id="4" name="PING">
                 <field name="time_usec" type="uint64_t"/>
                 <field name="seq" type="uint32_t"/>
                 <field name="target_system" type="uint8_t"/>
                 <field name="target_component" type="uint8_t"/>
               </message>
             </messages>
           </mavlink>"#,
    );

    let heartbeat = &table.messages_by_id[&0];
    assert_eq!(heartbeat.payload_size, 9);
    assert_eq!(heartbeat.crc_extra, 50);

    let ping = &table.messages_by_id[&4];
    assert_eq!(ping.payload_size, 14);
    assert_eq!(ping.crc_extra, 237);
}

#[test]
fn implicit_enum_values_restart_in_every_group() {
    let table = compile_one(
        r#"<mavlink>
             <enums>
               <enum name="FIRST">
                 <entry name="A"/>
                 <entry name="B"/>
               </enum>
               <enum name="SECOND">
                 <entry name="C"/>
               </enum>
             </enums>
           </mavlink>"#,
    );
    assert_eq!(table.enums.value_of("a"), Some(0));
    assert_eq!(table.enums.value_of("b"), Some(1));
    assert_eq!(table.enums.value_of("c"), Some(0));
}

#[test]
fn missing_include_fails_before_compilation() {
    let err = compile(
        &[XmlSource::new(
            "a.xml",
            r#"<mavlink><include>common.xml</include></mavlink>"#,
        )],
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::MissingInclude { include, file } => {
            assert_eq!(include, "common.xml");
            assert_eq!(file, "a.xml");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn include_closure_accepts_the_file_attribute_identity() {
    let table = compile(
        &[
            XmlSource::new(
                "a.xml",
                r#"<mavlink><include>common.xml</include></mavlink>"#,
            ),
            // effective name comes from the root attribute, not the caller
            XmlSource::new(
                "downloaded.xml",
                r#"<mavlink file="common.xml">
                     <messages><message id="1" name="SYS"/></messages>
                   </mavlink>"#,
            ),
        ],
        &CompileOptions::default(),
    )
    .expect("closure is complete");
    assert_eq!(table.sources, ["a.xml", "common.xml"]);
    assert!(table.messages_by_name.contains_key("sys"));
}

#[test]
fn nameless_source_is_fatal() {
    let err = compile(
        &[XmlSource::unnamed("<mavlink/>")],
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::MissingFileIdentity));
}

#[test]
fn nameless_enum_is_a_null_identifier() {
    let err = compile(
        &[XmlSource::new(
            "a.xml",
            r#"<mavlink><enums><enum><entry value="1" name="X"/></enum></enums></mavlink>"#,
        )],
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::NullIdentifier {
            element,
            attribute,
            file,
        } => {
            assert_eq!(element, "enum");
            assert_eq!(attribute, "name");
            assert_eq!(file, "a.xml");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn absent_message_id_is_a_null_identifier() {
    let err = compile(
        &[XmlSource::new(
            "a.xml",
            r#"<mavlink><messages><message name="M"/></messages></mavlink>"#,
        )],
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::NullIdentifier {
            element,
            attribute,
            file,
        } => {
            assert_eq!(element, "message");
            assert_eq!(attribute, "id");
            assert_eq!(file, "a.xml");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bad_message_id_is_not_an_integer() {
    let err = compile(
        &[XmlSource::new(
            "a.xml",
            r#"<mavlink><messages><message id="zero" name="M"/></messages></mavlink>"#,
        )],
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::NotAnInteger { identifier, text, file } => {
            assert_eq!(identifier, "M.id");
            assert_eq!(text, "zero");
            assert_eq!(file, "a.xml");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_field_type_carries_full_context() {
    let err = compile(
        &[XmlSource::new(
            "a.xml",
            r#"<mavlink>
                 <messages>
                   <message id="1" name="M">
                     <field name="x" type="uint9_t"/>
                   </message>
                 </messages>
               </mavlink>"#,
        )],
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::UnknownType {
            base_type,
            field,
            message,
            file,
        } => {
            assert_eq!(base_type, "uint9_t");
            assert_eq!(field, "x");
            assert_eq!(message, "M");
            assert_eq!(file, "a.xml");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_ids_within_one_dialect_are_rejected() {
    let err = compile(
        &[XmlSource::new(
            "a.xml",
            r#"<mavlink>
                 <messages>
                   <message id="1" name="FIRST"/>
                   <message id="1" name="SECOND"/>
                 </messages>
               </mavlink>"#,
        )],
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::MergeConflict {
            kind: ConflictKind::MessageId,
            ..
        }
    ));
}

fn two_dialects_sharing_id() -> [XmlSource; 2] {
    [
        XmlSource::new(
            "a.xml",
            r#"<mavlink><messages><message id="0" name="FIRST"/></messages></mavlink>"#,
        ),
        XmlSource::new(
            "b.xml",
            r#"<mavlink><messages><message id="0" name="SECOND"/></messages></mavlink>"#,
        ),
    ]
}

#[test]
fn merge_fails_on_message_id_conflict() {
    let err = compile(&two_dialects_sharing_id(), &CompileOptions::default()).unwrap_err();
    match err {
        CompileError::MergeConflict { kind, items, file } => {
            assert_eq!(kind, ConflictKind::MessageId);
            assert_eq!(items, ["0"]);
            assert_eq!(file, "b.xml");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn merge_fails_on_message_name_conflict() {
    let err = compile(
        &[
            XmlSource::new(
                "a.xml",
                r#"<mavlink><messages><message id="1" name="SAME"/></messages></mavlink>"#,
            ),
            XmlSource::new(
                "b.xml",
                r#"<mavlink><messages><message id="2" name="SAME"/></messages></mavlink>"#,
            ),
        ],
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::MergeConflict {
            kind: ConflictKind::MessageName,
            ..
        }
    ));
}

#[test]
fn merge_fails_on_enum_entry_conflict() {
    let err = compile(
        &[
            XmlSource::new(
                "a.xml",
                r#"<mavlink><enums><enum name="E1"><entry value="1" name="SHARED"/></enum></enums></mavlink>"#,
            ),
            XmlSource::new(
                "b.xml",
                r#"<mavlink><enums><enum name="E2"><entry value="9" name="SHARED"/></enum></enums></mavlink>"#,
            ),
        ],
        &CompileOptions::default(),
    )
    .unwrap_err();
    match err {
        CompileError::MergeConflict { kind, items, .. } => {
            assert_eq!(kind, ConflictKind::EnumEntry);
            assert_eq!(items, ["shared"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn override_policy_lets_the_later_source_win() {
    let options = CompileOptions {
        merge: MergePolicy::Override,
        ..Default::default()
    };
    let table = compile(&two_dialects_sharing_id(), &options).expect("override merge");
    assert_eq!(table.messages_by_id[&0].name, "SECOND");
    // the displaced message left both indexes
    assert!(!table.messages_by_name.contains_key("first"));
    assert_eq!(table.messages_by_name.len(), 1);
}

#[test]
fn disjoint_merge_is_commutative() {
    let a = XmlSource::new(
        "a.xml",
        r#"<mavlink>
             <enums><enum name="EA"><entry value="1" name="A_ONE"/></enum></enums>
             <messages><message id="1" name="ALPHA"><field name="x" type="uint8_t"/></message></messages>
           </mavlink>"#,
    );
    let b = XmlSource::new(
        "b.xml",
        r#"<mavlink>
             <enums><enum name="EB"><entry value="2" name="B_TWO"/></enum></enums>
             <messages><message id="2" name="BETA"><field name="y" type="uint16_t"/></message></messages>
           </mavlink>"#,
    );

    let options = CompileOptions::default();
    let ab = compile(&[a.clone(), b.clone()], &options).unwrap();
    let ba = compile(&[b, a], &options).unwrap();

    assert_eq!(ab.enums, ba.enums);
    assert_eq!(ab.messages_by_id, ba.messages_by_id);
    assert_eq!(ab.messages_by_name, ba.messages_by_name);
}

#[test]
fn descriptions_are_collected_only_on_request() {
    let xml = r#"<mavlink>
                   <enums>
                     <enum name="MODES">
                       <description>Operating modes.</description>
                       <entry value="1" name="FOO">
                         <description>The first mode.</description>
                       </entry>
                     </enum>
                   </enums>
                   <messages>
                     <message id="1" name="MODES">
                       <description>Reports the mode.</description>
                     </message>
                   </messages>
                 </mavlink>"#;

    let silent = compile(
        &[XmlSource::new("a.xml", xml)],
        &CompileOptions::default(),
    )
    .unwrap();
    assert!(silent.descriptions.is_none());

    let documented = compile(
        &[XmlSource::new("a.xml", xml)],
        &CompileOptions {
            descriptions: true,
            ..Default::default()
        },
    )
    .unwrap();
    let descriptions = documented.descriptions.expect("tables requested");
    // an enum group and a message may share a key without colliding
    assert_eq!(descriptions.enums["modes"], "Operating modes.");
    assert_eq!(descriptions.messages["modes"], "Reports the mode.");
    assert_eq!(descriptions.enum_entries["foo"], "The first mode.");
}
