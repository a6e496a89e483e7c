use crate::memory::space::SpaceData;
use datafusion::arrow::array::{Array, ArrayRef, AsArray, RecordBatch, StringBuilder};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use quadsql_common::SqlRows;
use quadsql_model::schema::{
    CONTEXT_UUID, OBJECT_UUID, PREDICATE_UUID, SUBJECT_UUID, TERM_DATATYPE, TERM_LANG,
    TERM_TEXT, TERM_TYPE, TERM_UUID,
};
use std::sync::{Arc, LazyLock};

pub(super) static TERM_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(TERM_UUID, DataType::Utf8, false),
        Field::new(TERM_TEXT, DataType::Utf8, false),
        Field::new(TERM_TYPE, DataType::Utf8, false),
        Field::new(TERM_LANG, DataType::Utf8, true),
        Field::new(TERM_DATATYPE, DataType::Utf8, true),
    ]))
});

pub(super) static QUAD_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(SUBJECT_UUID, DataType::Utf8, false),
        Field::new(PREDICATE_UUID, DataType::Utf8, false),
        Field::new(OBJECT_UUID, DataType::Utf8, false),
        Field::new(CONTEXT_UUID, DataType::Utf8, false),
    ]))
});

/// Builds the term table of `data`.
pub(super) fn term_batch(data: &SpaceData) -> Result<RecordBatch, ArrowError> {
    let mut builders: [StringBuilder; 5] = Default::default();
    for (id, key) in data.terms() {
        let [uuid, text, kind, lang, datatype] = &mut builders;
        uuid.append_value(id.to_string());
        text.append_value(&key.text);
        kind.append_value(key.kind.code());
        lang.append_option(key.lang.as_deref());
        datatype.append_option(key.datatype.as_deref());
    }
    finish(&TERM_SCHEMA, builders)
}

/// Builds the quad table of `data`.
pub(super) fn quad_batch(data: &SpaceData) -> Result<RecordBatch, ArrowError> {
    let mut builders: [StringBuilder; 4] = Default::default();
    for quad in data.quads() {
        for (builder, id) in builders.iter_mut().zip(quad) {
            builder.append_value(id.to_string());
        }
    }
    finish(&QUAD_SCHEMA, builders)
}

fn finish<const N: usize>(
    schema: &SchemaRef,
    builders: [StringBuilder; N],
) -> Result<RecordBatch, ArrowError> {
    let columns = builders
        .into_iter()
        .map(|mut builder| -> ArrayRef { Arc::new(builder.finish()) })
        .collect();
    RecordBatch::try_new(Arc::clone(schema), columns)
}

/// Renders every cell of `batches` as text.
pub(super) fn to_rows(columns: Vec<String>, batches: &[RecordBatch]) -> Result<SqlRows, ArrowError> {
    let mut rows = Vec::new();
    for batch in batches {
        let texts = batch
            .columns()
            .iter()
            .map(|column| cast(column, &DataType::Utf8))
            .collect::<Result<Vec<_>, _>>()?;
        for row in 0..batch.num_rows() {
            rows.push(
                texts
                    .iter()
                    .map(|column| {
                        let column = column.as_string::<i32>();
                        (!column.is_null(row)).then(|| column.value(row).to_owned())
                    })
                    .collect(),
            );
        }
    }
    Ok(SqlRows::new(columns, rows))
}
