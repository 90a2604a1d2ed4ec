//! Procedural macros used in the definition and implementation of getters and setters for ChainBuildSettings

use quote::quote;
use syn::parse::ParseStream;
use syn::parse::{Parse, Result};
use syn::{Expr, Ident, Token};

type KeyName = Ident;
type KeyType = Ident;
type DefaultValue = Expr;

/// Accessor contains the results of parsing a cbs_gets_and_sets definition, i.e., the
/// name of a value stored in a ChainBuildSettings map and the corresponding type.
struct Accessor {
    key_name: KeyName,
    key_type: KeyType,
}

/// Syntax contains the components of a cbs_gets_and_sets, i.e., a key name, a comma and
/// a value type. For example:
///     ```
///     cbs_gets_and_sets!(CBS_CERTIFICATE_POLICY, Strings);
///     ```
struct Syntax {
    key_name: KeyName,
    _comma_token: Token!(,),
    key_type: KeyType,
}

impl Parse for Accessor {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        if stream.is_empty() {
            return Err(stream.error("expected a settings key and a value type"));
        }

        let syntax = Syntax {
            key_name: stream.parse()?,
            _comma_token: stream.parse()?,
            key_type: stream.parse()?,
        };

        Ok(Accessor {
            key_name: syntax.key_name,
            key_type: syntax.key_type,
        })
    }
}

/// AccessorWithDefault contains the results of parsing a cbs_gets_and_sets_with_default definition,
/// i.e., the name of a value stored in a ChainBuildSettings map, the corresponding type and the
/// value returned when the key is absent.
struct AccessorWithDefault {
    key_name: KeyName,
    key_type: KeyType,
    default_value: DefaultValue,
}

/// SyntaxWithDefault contains the components of a cbs_gets_and_sets_with_default. For example:
///     ```
///     cbs_gets_and_sets_with_default!(CBS_MAX_CHAIN_DEPTH, u8, 32);
///     ```
struct SyntaxWithDefault {
    key_name: KeyName,
    _comma_token: Token!(,),
    key_type: KeyType,
    _comma_token2: Token!(,),
    default_value: DefaultValue,
}

impl Parse for AccessorWithDefault {
    fn parse(stream: ParseStream<'_>) -> Result<Self> {
        if stream.is_empty() {
            return Err(stream.error("expected a settings key, a value type and a default value"));
        }

        let syntax = SyntaxWithDefault {
            key_name: stream.parse()?,
            _comma_token: stream.parse()?,
            key_type: stream.parse()?,
            _comma_token2: stream.parse()?,
            default_value: stream.parse()?,
        };

        Ok(AccessorWithDefault {
            key_name: syntax.key_name,
            key_type: syntax.key_type,
            default_value: syntax.default_value,
        })
    }
}

/// is_string_numeric is used to determine if a string value contains only numeric characters.
/// It is used to process a slice that omits the first character, i.e., in order to identify
/// types like u8, u64, etc.
fn is_string_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_numeric())
}

/// Names shared by both macro flavors: the getter and setter identifiers and the
/// ChainBuildSettingTypes variant that carries the value.
struct AccessorNames {
    getter: Ident,
    setter: Ident,
    variant: Ident,
    getter_comment: String,
    setter_comment: String,
}

fn accessor_names(key: &Ident, key_type: &Ident) -> AccessorNames {
    // CBS_MAX_CHAIN_DEPTH yields get_max_chain_depth and set_max_chain_depth
    let key_str = format!("{}", key);
    let stem = match key_str.find('_') {
        Some(pos) => key_str[pos + 1..].to_lowercase(),
        None => key_str.to_lowercase(),
    };
    let getter_str = format!("get_{}", stem);
    let setter_str = format!("set_{}", stem);

    let type_str = format!("{}", key_type);
    let variant_str = if type_str == "bool" {
        "Bool".to_string()
    } else if is_string_numeric(&type_str[1..]) {
        type_str.to_uppercase()
    } else {
        type_str
    };

    AccessorNames {
        getter: Ident::new(&getter_str, key.span()),
        setter: Ident::new(&setter_str, key.span()),
        variant: Ident::new(&variant_str, key_type.span()),
        getter_comment: format!(
            "`{}` is used to retrieve `{}` items from a [`ChainBuildSettings`] instance",
            getter_str, key
        ),
        setter_comment: format!(
            "`{}` is used to set `{}` items in a [`ChainBuildSettings`] instance",
            setter_str, key
        ),
    }
}

/// Generates `get_x(&ChainBuildSettings) -> Option<T>` and `set_x(&mut ChainBuildSettings, T)`
/// for a `CBS_X` key.
#[proc_macro]
pub fn cbs_gets_and_sets(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let accessor = syn::parse_macro_input!(input as Accessor);
    let key = accessor.key_name;
    let return_t = accessor.key_type;
    let AccessorNames {
        getter,
        setter,
        variant,
        getter_comment,
        setter_comment,
    } = accessor_names(&key, &return_t);

    let tokens = quote! {
            #[doc = #getter_comment]
            pub fn #getter(cbs: &ChainBuildSettings) -> Option<#return_t> {
                match cbs.get(#key) {
                    Some(ChainBuildSettingTypes::#variant(v)) => Some(v.clone()),
                    _ => None,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(cbs: &mut ChainBuildSettings, v: #return_t) {
                cbs.insert(#key.to_string(), ChainBuildSettingTypes::#variant(v));
            }
    };
    tokens.into()
}

/// Generates `get_x(&ChainBuildSettings) -> T` (falling back to the given default) and
/// `set_x(&mut ChainBuildSettings, T)` for a `CBS_X` key.
#[proc_macro]
pub fn cbs_gets_and_sets_with_default(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let accessor = syn::parse_macro_input!(input as AccessorWithDefault);
    let key = accessor.key_name;
    let return_t = accessor.key_type;
    let default_value = accessor.default_value;
    let AccessorNames {
        getter,
        setter,
        variant,
        getter_comment,
        setter_comment,
    } = accessor_names(&key, &return_t);

    let tokens = quote! {
            #[doc = #getter_comment]
            pub fn #getter(cbs: &ChainBuildSettings) -> #return_t {
                match cbs.get(#key) {
                    Some(ChainBuildSettingTypes::#variant(v)) => v.clone(),
                    _ => #default_value,
                }
            }
            #[doc = #setter_comment]
            pub fn #setter(cbs: &mut ChainBuildSettings, v: #return_t) {
                cbs.insert(#key.to_string(), ChainBuildSettingTypes::#variant(v));
            }
    };
    tokens.into()
}
