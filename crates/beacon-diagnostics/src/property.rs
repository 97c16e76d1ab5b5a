use std::borrow::Cow;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// 诊断属性值：标量或嵌套的结构化负载。
///
/// # 教案式说明
/// - **意图（Why）**：贡献者写入的值最终会被日志后端消费，强类型枚举避免在收集阶段就退化为字符串，
///   让后端自行决定渲染方式。
/// - **结构（How）**：
///   - 标量：`Null`/`Bool`/`Int`/`UInt`/`Float`/`Text`；
///   - `Sequence`：有序列表；
///   - `Structure`：带可选类型标签的有序字段集合，对应“解构后的对象”；
///   - `Dictionary`：以字符串为键的映射，保持插入顺序。
/// - **契约（What）**：
///   - 实现 [`fmt::Display`]，文本以带引号形式输出，便于在日志里区分 `"200"` 与 `200`；
///   - 实现 [`serde::Serialize`]，`Structure` 序列化为对象，类型标签写入 `$type` 字段。
/// - **权衡（Trade-offs）**：`Structure`/`Dictionary` 使用 `Vec` 而非 `HashMap`，保留字段顺序且小集合下更省内存；
///   字段名唯一性由调用方保证。
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(Cow<'static, str>),
    Sequence(Vec<PropertyValue>),
    Structure {
        type_tag: Option<Cow<'static, str>>,
        fields: Vec<(Cow<'static, str>, PropertyValue)>,
    },
    Dictionary(Vec<(Cow<'static, str>, PropertyValue)>),
}

impl PropertyValue {
    /// 以类型标签构造空结构体，随后通过 [`Self::with_field`] 追加字段。
    pub fn structure(type_tag: impl Into<Cow<'static, str>>) -> Self {
        Self::Structure {
            type_tag: Some(type_tag.into()),
            fields: Vec::new(),
        }
    }

    /// 为 `Structure` 或 `Dictionary` 追加字段；其他变体原样返回。
    pub fn with_field(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        match &mut self {
            Self::Structure { fields, .. } | Self::Dictionary(fields) => {
                fields.push((name.into(), value.into()));
            }
            _ => {}
        }
        self
    }

    /// 是否为标量值。
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::Sequence(_) | Self::Structure { .. } | Self::Dictionary(_)
        )
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Structure { type_tag, fields } => {
                if let Some(tag) = type_tag {
                    write!(f, "{tag} ")?;
                }
                f.write_str("{ ")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            Self::Dictionary(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::UInt(value) => serializer.serialize_u64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Structure { type_tag, fields } => {
                let len = fields.len() + usize::from(type_tag.is_some());
                let mut map = serializer.serialize_map(Some(len))?;
                if let Some(tag) = type_tag {
                    map.serialize_entry("$type", tag)?;
                }
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Self::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for PropertyValue {
            fn from(value: $ty) -> Self {
                Self::UInt(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&'static str> for PropertyValue {
    fn from(value: &'static str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl From<Cow<'static, str>> for PropertyValue {
    fn from(value: Cow<'static, str>) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// 具名诊断属性。
///
/// - **契约（What）**：`name` 是属性在收集器内的唯一身份，重复写入同名属性时后写者覆盖前者；
///   名称不做非空或格式校验。
#[derive(Clone, Debug, PartialEq)]
pub struct LogProperty {
    name: Cow<'static, str>,
    value: PropertyValue,
}

impl LogProperty {
    pub fn new(name: impl Into<Cow<'static, str>>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn into_parts(self) -> (Cow<'static, str>, PropertyValue) {
        (self.name, self.value)
    }

    pub(crate) fn key(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

impl fmt::Display for LogProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// 将一组属性按“名称 -> 值”序列化为对象，供宿主层渲染收集结果。
///
/// 同名属性在收集器内已被去重，因此这里按切片顺序直接输出。
#[derive(Clone, Copy, Debug)]
pub struct PropertyMap<'a>(pub &'a [LogProperty]);

impl Serialize for PropertyMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for property in self.0 {
            map.serialize_entry(property.name(), property.value())?;
        }
        map.end()
    }
}
