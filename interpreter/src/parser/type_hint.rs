use renzmc_core::{Diagnostic, Literal, Type};

use crate::ast::TypeHint;

use super::Parser;

// Type hints are kept as canonical strings: union members are joined with " | ",
// generic arguments with ", ", and an optional trailing '?' marks the hint optional.
impl Parser {
    pub(super) fn type_hint(&mut self) -> Result<TypeHint, Diagnostic> {
        let token = self.current.clone();
        let mut components = vec![self.type_component()?];
        while self.match_one(Type::Pipe)? {
            components.push(self.type_component()?);
        }

        Ok(TypeHint {
            name: components.join(" | "),
            token,
        })
    }

    fn type_component(&mut self) -> Result<String, Diagnostic> {
        let mut text = self.type_name()?;

        if self.match_one(Type::LeftBracket)? {
            let mut params = Vec::new();
            while !self.check(Type::RightBracket) {
                params.push(self.nested(Self::generic_param)?);
                if !self.match_one(Type::Comma)? {
                    break;
                }
            }
            self.consume(Type::RightBracket)?;
            text = format!("{}[{}]", text, params.join(", "));
        }

        if self.match_one(Type::Question)? {
            text.push('?');
        }
        Ok(text)
    }

    fn type_name(&mut self) -> Result<String, Diagnostic> {
        match self.current.ty {
            Type::Identifier => Ok(self.advance()?.lexeme),
            // spelled like keywords but valid type names
            Type::Nil | Type::Function => Ok(self.advance()?.lexeme),
            _ => Err(self.expected("nama tipe")),
        }
    }

    fn generic_param(&mut self) -> Result<String, Diagnostic> {
        match self.current.ty {
            Type::String => {
                let token = self.advance()?;
                let text = match token.value {
                    Literal::Str(text) => text,
                    other => other.to_string(),
                };
                let mut param = format!("\"{}\"", text);
                if self.match_one(Type::Colon)? {
                    param.push_str(" :");
                    if self.check(Type::Identifier) {
                        param.push(' ');
                        param.push_str(&self.advance()?.lexeme);
                    }
                }
                Ok(param)
            }
            Type::Integer | Type::Float => Ok(self.advance()?.lexeme),
            _ => {
                let mut members = vec![self.type_component()?];
                while self.match_one(Type::Pipe)? {
                    members.push(self.type_component()?);
                }
                Ok(members.join(" | "))
            }
        }
    }
}
