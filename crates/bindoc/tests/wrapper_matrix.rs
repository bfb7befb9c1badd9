//! End-to-end matrix tests for the discriminated wrapper codec.

use std::any::Any;
use std::sync::Arc;

use proptest::prelude::*;

use bindoc::{
    CodecCx, CodecError, CodecRegistry, CoordTripleCodec, DiscriminatedWrapperCodec,
    DiscriminatorConvention, DocReader, DocValue, DocValueCodec, DocWriter,
    HierarchicalDiscriminatorConvention, RegistryDispatchCodec, ScalarDiscriminatorConvention,
    ValueCodec,
};

#[derive(Debug, Clone, PartialEq)]
struct Circle {
    radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Square {
    side: f64,
}

struct CircleCodec;

impl ValueCodec for CircleCodec {
    fn encode(
        &self,
        writer: &mut DocWriter,
        _cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let circle = value
            .downcast_ref::<Circle>()
            .ok_or(CodecError::RuntimeTypeMismatch { expected: "Circle" })?;
        writer.write_start_document();
        writer.write_name("radius");
        writer.write_f64(circle.radius);
        writer.write_end_document();
        Ok(())
    }

    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        _cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        reader.read_start_document()?;
        let mut radius = 0.0;
        while reader.read_type()? != bindoc::ElementType::EndOfDocument {
            match reader.read_name()? {
                "radius" => radius = reader.read_f64()?,
                _ => reader.skip_value()?,
            }
        }
        reader.read_end_document()?;
        Ok(Box::new(Circle { radius }))
    }
}

struct SquareCodec;

impl ValueCodec for SquareCodec {
    fn encode(
        &self,
        writer: &mut DocWriter,
        _cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let square = value
            .downcast_ref::<Square>()
            .ok_or(CodecError::RuntimeTypeMismatch { expected: "Square" })?;
        writer.write_start_document();
        writer.write_name("side");
        writer.write_f64(square.side);
        writer.write_end_document();
        Ok(())
    }

    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        _cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        reader.read_start_document()?;
        let mut side = 0.0;
        while reader.read_type()? != bindoc::ElementType::EndOfDocument {
            match reader.read_name()? {
                "side" => side = reader.read_f64()?,
                _ => reader.skip_value()?,
            }
        }
        reader.read_end_document()?;
        Ok(Box::new(Square { side }))
    }
}

fn registry() -> CodecRegistry {
    let mut registry = CodecRegistry::new();
    registry.register::<Circle>("Circle", Arc::new(CircleCodec));
    registry.register::<Square>("Square", Arc::new(SquareCodec));
    registry.register::<[f64; 3]>("Position", Arc::new(CoordTripleCodec));
    registry.register::<DocValue>("Doc", Arc::new(DocValueCodec));
    registry
}

fn wrapper_with(convention: Arc<dyn DiscriminatorConvention>) -> DiscriminatedWrapperCodec {
    DiscriminatedWrapperCodec::new(convention, Arc::new(RegistryDispatchCodec))
}

fn encode(
    wrapper: &DiscriminatedWrapperCodec,
    registry: &CodecRegistry,
    nominal: &str,
    value: &dyn Any,
) -> Vec<u8> {
    let mut writer = DocWriter::new();
    wrapper
        .encode(&mut writer, &CodecCx::new(registry, nominal), value)
        .expect("encode");
    writer.into_bytes()
}

#[test]
fn roundtrip_matrix_over_conventions_and_shapes() {
    let registry = registry();
    let conventions: Vec<Arc<dyn DiscriminatorConvention>> = vec![
        Arc::new(ScalarDiscriminatorConvention::default()),
        Arc::new(ScalarDiscriminatorConvention::new("$type")),
        Arc::new(
            HierarchicalDiscriminatorConvention::new("_t")
                .with_path(&["Shape", "Circle"])
                .with_path(&["Shape", "Square"]),
        ),
    ];
    for convention in conventions {
        let wrapper = wrapper_with(convention);

        for radius in [0.0, 3.75, -2.0, f64::MAX] {
            let bytes = encode(&wrapper, &registry, "Shape", &Circle { radius });
            let mut reader = DocReader::new(&bytes);
            assert!(wrapper.is_positioned_at_wrapper(&mut reader).unwrap());
            let value = wrapper
                .decode(&mut reader, &CodecCx::new(&registry, "Shape"))
                .unwrap();
            assert_eq!(value.downcast_ref::<Circle>(), Some(&Circle { radius }));
        }

        let bytes = encode(&wrapper, &registry, "Shape", &Square { side: 4.5 });
        let mut reader = DocReader::new(&bytes);
        let value = wrapper
            .decode(&mut reader, &CodecCx::new(&registry, "Shape"))
            .unwrap();
        assert_eq!(value.downcast_ref::<Square>(), Some(&Square { side: 4.5 }));
    }
}

#[test]
fn wrapper_chooses_path_inside_an_outer_document() {
    let registry = registry();
    let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));

    // One outer document with a tagged field and a plain field.
    let mut writer = DocWriter::new();
    writer.write_start_document();
    writer.write_name("shape");
    wrapper
        .encode(
            &mut writer,
            &CodecCx::new(&registry, "Shape"),
            &Circle { radius: 9.0 },
        )
        .unwrap();
    writer.write_name("count");
    writer.write_i32(7);
    writer.write_end_document();
    let bytes = writer.into_bytes();

    let mut reader = DocReader::new(&bytes);
    reader.read_start_document().unwrap();

    // First field: the probe says tagged, so take the wrapper path.
    reader.read_type().unwrap();
    assert_eq!(reader.read_name().unwrap(), "shape");
    assert!(wrapper.is_positioned_at_wrapper(&mut reader).unwrap());
    let value = wrapper
        .decode(&mut reader, &CodecCx::new(&registry, "Shape"))
        .unwrap();
    assert_eq!(value.downcast_ref::<Circle>(), Some(&Circle { radius: 9.0 }));

    // Second field: the probe says plain, so read it directly.
    reader.read_type().unwrap();
    assert_eq!(reader.read_name().unwrap(), "count");
    assert!(!wrapper.is_positioned_at_wrapper(&mut reader).unwrap());
    assert_eq!(reader.read_i32().unwrap(), 7);

    reader.read_end_document().unwrap();
}

#[test]
fn scalar_convention_accepts_hierarchy_array_discriminator() {
    let registry = registry();
    let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
    let mut writer = DocWriter::new();
    writer.write_value(&DocValue::Document(vec![
        (
            "_t".to_string(),
            DocValue::Array(vec![
                DocValue::Str("Shape".to_string()),
                DocValue::Str("Square".to_string()),
            ]),
        ),
        (
            "_v".to_string(),
            DocValue::Document(vec![("side".to_string(), DocValue::Float(2.0))]),
        ),
    ]));
    let bytes = writer.into_bytes();

    let mut reader = DocReader::new(&bytes);
    let value = wrapper
        .decode(&mut reader, &CodecCx::new(&registry, "Shape"))
        .unwrap();
    assert_eq!(value.downcast_ref::<Square>(), Some(&Square { side: 2.0 }));
}

#[test]
fn coord_triple_payload_roundtrip() {
    let registry = registry();
    let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
    let position: [f64; 3] = [12.5, -3.25, 0.0];

    let bytes = encode(&wrapper, &registry, "Geometry", &position);
    let mut reader = DocReader::new(&bytes);
    let value = wrapper
        .decode(&mut reader, &CodecCx::new(&registry, "Geometry"))
        .unwrap();
    assert_eq!(value.downcast_ref::<[f64; 3]>(), Some(&position));
}

#[test]
fn coord_triple_wrong_arity_is_an_error() {
    let registry = registry();
    let mut writer = DocWriter::new();
    writer.write_value(&DocValue::Document(vec![(
        "p".to_string(),
        DocValue::Array(vec![DocValue::Float(1.0), DocValue::Float(2.0)]),
    )]));
    let bytes = writer.into_bytes();

    let mut reader = DocReader::new(&bytes);
    reader.read_start_document().unwrap();
    reader.read_type().unwrap();
    reader.read_name().unwrap();
    let err = CoordTripleCodec
        .decode(&mut reader, &CodecCx::new(&registry, "Position"))
        .unwrap_err();
    assert_eq!(
        err,
        CodecError::WrongArity {
            expected: 3,
            found: 2,
        }
    );
}

#[test]
fn doc_value_payload_roundtrip() {
    let registry = registry();
    let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
    let doc = DocValue::Document(vec![
        ("name".to_string(), DocValue::Str("grid".to_string())),
        (
            "cells".to_string(),
            DocValue::Array(vec![DocValue::Int32(1), DocValue::Null, DocValue::Boolean(true)]),
        ),
    ]);

    let bytes = encode(&wrapper, &registry, "Doc", &doc);
    let mut reader = DocReader::new(&bytes);
    let value = wrapper
        .decode(&mut reader, &CodecCx::new(&registry, "Doc"))
        .unwrap();
    assert_eq!(value.downcast_ref::<DocValue>(), Some(&doc));
}

#[test]
fn every_truncation_errors_and_rewinds() {
    let registry = registry();
    let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
    let bytes = encode(&wrapper, &registry, "Shape", &Circle { radius: 2.5 });

    for cut in 0..bytes.len() {
        let prefix = &bytes[..cut];
        let mut reader = DocReader::new(prefix);
        assert!(
            wrapper.is_positioned_at_wrapper(&mut reader).is_err(),
            "cut at {cut} should be a stream error"
        );
        assert_eq!(reader.pos(), 0, "cut at {cut} must rewind");
    }
}

proptest! {
    #[test]
    fn roundtrip_any_radius(radius in -1.0e12f64..1.0e12) {
        let registry = registry();
        let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
        let bytes = encode(&wrapper, &registry, "Shape", &Circle { radius });
        let mut reader = DocReader::new(&bytes);
        let value = wrapper
            .decode(&mut reader, &CodecCx::new(&registry, "Shape"))
            .unwrap();
        prop_assert_eq!(value.downcast_ref::<Circle>(), Some(&Circle { radius }));
    }

    #[test]
    fn roundtrip_any_position(x in -1.0e9f64..1.0e9, y in -1.0e9f64..1.0e9, z in -1.0e9f64..1.0e9) {
        let registry = registry();
        let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
        let position = [x, y, z];
        let bytes = encode(&wrapper, &registry, "Geometry", &position);
        let mut reader = DocReader::new(&bytes);
        let value = wrapper
            .decode(&mut reader, &CodecCx::new(&registry, "Geometry"))
            .unwrap();
        prop_assert_eq!(value.downcast_ref::<[f64; 3]>(), Some(&position));
    }

    #[test]
    fn any_discriminator_name_works(name in "[a-zA-Z$][a-zA-Z0-9_]{0,11}") {
        // "_v" itself would collide with the payload field name.
        prop_assume!(name != "_v");
        let registry = registry();
        let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::new(name)));
        let bytes = encode(&wrapper, &registry, "Shape", &Square { side: 1.5 });
        let mut reader = DocReader::new(&bytes);
        prop_assert!(wrapper.is_positioned_at_wrapper(&mut reader).unwrap());
        prop_assert_eq!(reader.pos(), 0);
        let value = wrapper
            .decode(&mut reader, &CodecCx::new(&registry, "Shape"))
            .unwrap();
        prop_assert_eq!(value.downcast_ref::<Square>(), Some(&Square { side: 1.5 }));
    }

    #[test]
    fn single_field_document_is_never_a_wrapper(name in "[a-z_]{1,8}", n in any::<i32>()) {
        let wrapper = wrapper_with(Arc::new(ScalarDiscriminatorConvention::default()));
        let mut writer = DocWriter::new();
        writer.write_value(&DocValue::Document(vec![(name, DocValue::Int32(n))]));
        let bytes = writer.into_bytes();
        let mut reader = DocReader::new(&bytes);
        prop_assert!(!wrapper.is_positioned_at_wrapper(&mut reader).unwrap());
        prop_assert_eq!(reader.pos(), 0);
    }
}
