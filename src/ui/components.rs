/// Reusable popup widgets

use yew::prelude::*;

use crate::config::GroupColor;

/// Swatch hex values approximating the host's group palette.
pub fn swatch_hex(color: GroupColor) -> &'static str {
    match color {
        GroupColor::Grey => "#5f6368",
        GroupColor::Blue => "#1a73e8",
        GroupColor::Red => "#d93025",
        GroupColor::Yellow => "#f9ab00",
        GroupColor::Green => "#188038",
        GroupColor::Pink => "#d01884",
        GroupColor::Purple => "#a142f4",
        GroupColor::Cyan => "#007b83",
        GroupColor::Orange => "#fa903e",
    }
}

#[derive(Properties, PartialEq)]
pub struct ColorPickerProps {
    pub selected: GroupColor,
    pub on_select: Callback<GroupColor>,
}

#[function_component(ColorPicker)]
pub fn color_picker(props: &ColorPickerProps) -> Html {
    html! {
        <div class="color-picker">
            {for GroupColor::ALL.iter().map(|color| {
                let color = *color;
                let on_select = props.on_select.clone();
                let border = if props.selected == color {
                    "2px solid #333"
                } else {
                    "2px solid transparent"
                };
                html! {
                    <button
                        type="button"
                        title={color.as_str()}
                        onclick={Callback::from(move |_| on_select.emit(color))}
                        style={format!("width: 22px; height: 22px; border-radius: 50%; cursor: pointer; margin-right: 4px; background-color: {}; border: {};", swatch_hex(color), border)}
                    />
                }
            })}
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ColorDotProps {
    pub color: GroupColor,
}

#[function_component(ColorDot)]
pub fn color_dot(props: &ColorDotProps) -> Html {
    html! {
        <span style={format!("display: inline-block; width: 10px; height: 10px; border-radius: 50%; margin-right: 6px; background-color: {};", swatch_hex(props.color))}></span>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_palette_color_has_a_swatch() {
        for color in GroupColor::ALL {
            assert!(swatch_hex(color).starts_with('#'));
        }
    }
}
