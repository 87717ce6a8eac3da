//! Registration-time description of persisted record types.

use crate::schema::Column;
use crate::value::{FieldKind, FieldValue, Value};

/// A plain data record that can be persisted and mapped from result rows.
///
/// Implementations are generated by [`impl_record!`](crate::impl_record); the
/// field positions used by [`Record::get`] and [`Record::set`] are the
/// declaration order in the macro invocation.
pub trait Record: Default + Send + Sync + 'static {
    /// Record name, also used as the table name.
    const NAME: &'static str;

    /// Number of described fields.
    const FIELD_COUNT: usize;

    /// Column description in declaration order.
    fn columns() -> Vec<Column>;

    /// Read field `field` as a [`Value`]; out-of-range positions yield `Null`.
    fn get(&self, field: usize) -> Value;

    /// Write a value already converted to the field's kind.
    ///
    /// Returns `false` when the value does not fit the field.
    fn set(&mut self, field: usize, value: Value) -> bool;

    /// Identity of the record.
    fn id(&self) -> &str;
}

#[doc(hidden)]
pub fn kind_of<T: FieldValue>(_: &T) -> FieldKind {
    T::KIND
}

/// Implement [`Record`] for a struct with an `id: String` field.
///
/// Each entry maps a struct field to its lower-case column name and may carry
/// column modifiers in brackets: `key`, `version`, `insert_only`, `read_only`
/// and `bool_literals("1", "0")`.
///
/// # Usage
///
/// ```rust
/// use catalog_store::{impl_record, Record};
///
/// #[derive(Debug, Default)]
/// struct Channel {
///     id: String,
///     title: String,
///     view_count: i64,
/// }
///
/// impl_record!(Channel => "channel" {
///     id: "id" [key],
///     title: "title",
///     view_count: "views",
/// });
///
/// assert_eq!(Channel::FIELD_COUNT, 3);
/// assert_eq!(Channel::columns()[2].name, "views");
/// ```
#[macro_export]
macro_rules! impl_record {
    (
        $ty:ty => $name:literal {
            $(
                $field:ident : $column:literal
                $( [ $( $flag:ident $( ( $( $arg:expr ),* ) )? ),+ ] )?
            ),+ $(,)?
        }
    ) => {
        impl $crate::Record for $ty {
            const NAME: &'static str = $name;
            const FIELD_COUNT: usize = $crate::impl_record!(@count $( $field )+);

            #[allow(unused_assignments)]
            fn columns() -> ::std::vec::Vec<$crate::Column> {
                let sample = <$ty as ::std::default::Default>::default();
                let mut columns = ::std::vec::Vec::with_capacity(Self::FIELD_COUNT);
                let mut index = 0usize;
                $(
                    columns.push(
                        $crate::Column::new($column, index, $crate::record::kind_of(&sample.$field))
                        $( $( .$flag( $( $( $arg ),* )? ) )+ )?
                    );
                    index += 1;
                )+
                columns
            }

            #[allow(unused_assignments)]
            fn get(&self, field: usize) -> $crate::Value {
                let mut index = 0usize;
                $(
                    if field == index {
                        return $crate::FieldValue::to_value(&self.$field);
                    }
                    index += 1;
                )+
                $crate::Value::Null
            }

            #[allow(unused_assignments)]
            fn set(&mut self, field: usize, value: $crate::Value) -> bool {
                let mut index = 0usize;
                $(
                    if field == index {
                        return match $crate::FieldValue::from_value(value) {
                            ::std::option::Option::Some(v) => {
                                self.$field = v;
                                true
                            }
                            ::std::option::Option::None => false,
                        };
                    }
                    index += 1;
                )+
                false
            }

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
    (@count) => { 0usize };
    (@count $head:ident $( $tail:ident )*) => {
        1usize + $crate::impl_record!(@count $( $tail )*)
    };
}
